//! Single-file NIfTI-1 reading and writing, optionally gzip compressed
//!
//! Geometry is converted between the NIfTI RAS convention and the LPS
//! convention used by [`Volume`]: the x and y components of every position and
//! direction change sign.

use crate::io::error::{FileSystemContext, Result, invalid_image, unsupported_image};
use crate::volume::voxels::{IDENTITY_DIRECTION, PixelType, Volume, swap_byte_order, transpose};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};
use std::path::Path;

/// Size of a NIfTI-1 header
pub const HEADER_SIZE: usize = 348;
/// Offset of voxel data in files written by this module
pub const VOX_OFFSET: usize = 352;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const SINGLE_FILE_MAGIC: &[u8; 4] = b"n+1\0";
const XFORM_SCANNER_ANAT: i16 = 1;

// Header field offsets
const DIM: usize = 40;
const DATATYPE: usize = 70;
const BITPIX: usize = 72;
const PIXDIM: usize = 76;
const VOX_OFFSET_FIELD: usize = 108;
const SCL_SLOPE: usize = 112;
const SCL_INTER: usize = 116;
const XYZT_UNITS: usize = 123;
const QFORM_CODE: usize = 252;
const SFORM_CODE: usize = 254;
const QUATERN_B: usize = 256;
const QOFFSET_X: usize = 268;
const SROW_X: usize = 280;
const MAGIC: usize = 344;

/// Millimetre spatial units, seconds temporal units
const UNITS_MM_SEC: u8 = 2 | 8;

/// Read a `.nii` or `.nii.gz` file
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a valid NIfTI-1 image,
/// or uses a feature outside the supported subset
pub fn read_nifti(path: &Path) -> Result<Volume> {
    let raw = std::fs::read(path).fs_context(path, "read NIfTI")?;
    let bytes = if raw.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|e| invalid_image(path, &format!("gzip stream is corrupt: {e}")))?;
        decoded
    } else {
        raw
    };
    decode_nifti(&bytes, path)
}

/// Write a volume as single-file NIfTI-1, gzip compressed when the name ends in `.gz`
///
/// # Errors
///
/// Returns an error if the file cannot be created or written
pub fn write_nifti(volume: &Volume, path: &Path) -> Result<()> {
    let bytes = encode_nifti(volume);
    let compress = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(".gz"));
    if compress {
        let file = std::fs::File::create(path).fs_context(path, "create NIfTI")?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&bytes).fs_context(path, "write NIfTI")?;
        encoder.finish().fs_context(path, "write NIfTI")?;
    } else {
        std::fs::write(path, bytes).fs_context(path, "write NIfTI")?;
    }
    Ok(())
}

/// Little- or big-endian view over header bytes
struct HeaderReader<'a> {
    bytes: &'a [u8],
    big_endian: bool,
}

impl HeaderReader<'_> {
    fn field<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let slice = self.bytes.get(offset..offset + N)?;
        let mut field: [u8; N] = slice.try_into().ok()?;
        if self.big_endian {
            field.reverse();
        }
        Some(field)
    }

    fn i16_at(&self, offset: usize) -> Option<i16> {
        self.field(offset).map(i16::from_le_bytes)
    }

    fn i32_at(&self, offset: usize) -> Option<i32> {
        self.field(offset).map(i32::from_le_bytes)
    }

    fn f32_at(&self, offset: usize) -> Option<f32> {
        self.field(offset).map(f32::from_le_bytes)
    }

    fn f32_array<const N: usize>(&self, offset: usize) -> Option<[f64; N]> {
        let mut values = [0.0; N];
        for (i, value) in values.iter_mut().enumerate() {
            *value = f64::from(self.f32_at(offset + 4 * i)?);
        }
        Some(values)
    }
}

/// Decode an uncompressed NIfTI-1 byte stream
///
/// `path` is only used for error reporting.
///
/// # Errors
///
/// Returns an error if the header is malformed, the datatype is unsupported,
/// intensity scaling is present, or the voxel data is truncated
pub fn decode_nifti(bytes: &[u8], path: &Path) -> Result<Volume> {
    let truncated = || invalid_image(path, &"header is truncated");
    if bytes.len() < HEADER_SIZE {
        return Err(truncated());
    }

    let little = HeaderReader {
        bytes,
        big_endian: false,
    };
    let big_endian = match little.i32_at(0) {
        Some(348) => false,
        Some(v) if v.swap_bytes() == 348 => true,
        _ => return Err(invalid_image(path, &"sizeof_hdr is not 348")),
    };
    let header = HeaderReader { bytes, big_endian };

    let magic = bytes.get(MAGIC..MAGIC + 4).ok_or_else(truncated)?;
    if magic == b"ni1\0" {
        return Err(unsupported_image(path, &"two-file NIfTI pairs are not supported"));
    }
    if magic != SINGLE_FILE_MAGIC {
        return Err(invalid_image(path, &"missing n+1 magic"));
    }

    let mut dim = [0_i16; 8];
    for (i, d) in dim.iter_mut().enumerate() {
        *d = header.i16_at(DIM + 2 * i).ok_or_else(truncated)?;
    }
    let dims = spatial_dims(&dim).ok_or_else(|| {
        unsupported_image(path, &format!("dimensions {dim:?} are not a 2-D or 3-D volume"))
    })?;

    let datatype = header.i16_at(DATATYPE).ok_or_else(truncated)?;
    let pixel_type = PixelType::from_nifti_code(datatype)
        .ok_or_else(|| unsupported_image(path, &format!("datatype {datatype}")))?;

    let slope = header.f32_at(SCL_SLOPE).ok_or_else(truncated)?;
    let inter = header.f32_at(SCL_INTER).ok_or_else(truncated)?;
    let scaled = slope.is_finite() && slope != 0.0 && (slope != 1.0 || inter != 0.0);
    if scaled {
        return Err(unsupported_image(
            path,
            &format!("intensity scaling (slope {slope}, intercept {inter})"),
        ));
    }

    let [qfac, dx, dy, dz, ..]: [f64; 8] = header.f32_array(PIXDIM).ok_or_else(truncated)?;
    let spacing = [dx, dy, dz].map(positive_or_one);

    let geometry = Geometry::from_header(&header, qfac).ok_or_else(truncated)?;

    let vox_offset = header.f32_at(VOX_OFFSET_FIELD).ok_or_else(truncated)?;
    let offset = if vox_offset.is_finite() && vox_offset >= HEADER_SIZE as f32 {
        vox_offset as usize
    } else {
        VOX_OFFSET
    };
    let length = dims.iter().product::<usize>() * pixel_type.size();
    let mut data = bytes
        .get(offset..offset + length)
        .ok_or_else(|| invalid_image(path, &"voxel data is truncated"))?
        .to_vec();
    if big_endian {
        swap_byte_order(&mut data, pixel_type.size());
    }

    let volume = Volume::new(dims, pixel_type, data)
        .ok_or_else(|| invalid_image(path, &"voxel count does not match dimensions"))?;
    Ok(volume
        .with_spacing(spacing)
        .with_origin(geometry.origin)
        .with_direction(geometry.direction))
}

fn spatial_dims(dim: &[i16; 8]) -> Option<[usize; 3]> {
    let [ndim, sizes @ ..] = *dim;
    let ndim = usize::try_from(ndim).ok().filter(|n| (1..=7).contains(n))?;
    let mut extents = sizes
        .into_iter()
        .take(ndim)
        .map(|extent| usize::try_from(extent).ok().filter(|&n| n > 0));

    let mut spatial = [1_usize; 3];
    for slot in &mut spatial {
        match extents.next() {
            Some(extent) => *slot = extent?,
            None => break,
        }
    }
    // Any axis past z must be a singleton
    extents
        .all(|extent| extent == Some(1))
        .then_some(spatial)
}

const fn positive_or_one(value: f64) -> f64 {
    if value > 0.0 { value } else { 1.0 }
}

/// Origin and direction in LPS space
struct Geometry {
    origin: [f64; 3],
    direction: [[f64; 3]; 3],
}

impl Geometry {
    fn from_header(header: &HeaderReader<'_>, qfac: f64) -> Option<Self> {
        let qform_code = header.i16_at(QFORM_CODE)?;
        let sform_code = header.i16_at(SFORM_CODE)?;

        let ras = if sform_code > 0 {
            let rows: [[f64; 4]; 3] = [
                header.f32_array(SROW_X)?,
                header.f32_array(SROW_X + 16)?,
                header.f32_array(SROW_X + 32)?,
            ];
            let [[xx, xy, xz, ox], [yx, yy, yz, oy], [zx, zy, zz, oz]] = rows;
            let columns = [[xx, yx, zx], [xy, yy, zy], [xz, yz, zz]].map(unit_vector);
            Self {
                origin: [ox, oy, oz],
                direction: transpose(columns),
            }
        } else if qform_code > 0 {
            let [b, c, d]: [f64; 3] = header.f32_array(QUATERN_B)?;
            let offset: [f64; 3] = header.f32_array(QOFFSET_X)?;
            Self {
                origin: offset,
                direction: quaternion_to_direction(b, c, d, qfac),
            }
        } else {
            return Some(Self {
                origin: [0.0; 3],
                direction: IDENTITY_DIRECTION,
            });
        };
        Some(ras.flip_xy())
    }

    /// Convert between RAS and LPS
    fn flip_xy(self) -> Self {
        let [x, y, z] = self.origin;
        let [row_x, row_y, row_z] = self.direction;
        Self {
            origin: [-x, -y, z],
            direction: [row_x.map(|v| -v), row_y.map(|v| -v), row_z],
        }
    }
}

/// Scale a vector to unit length, leaving a zero vector unchanged
fn unit_vector(vector: [f64; 3]) -> [f64; 3] {
    let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    let norm = if norm > 0.0 { norm } else { 1.0 };
    vector.map(|v| v / norm)
}

fn quaternion_to_direction(b: f64, c: f64, d: f64, qfac: f64) -> [[f64; 3]; 3] {
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    let qfac = if qfac < 0.0 { -1.0 } else { 1.0 };
    [
        [
            a * a + b * b - c * c - d * d,
            2.0 * (b * c - a * d),
            2.0 * (b * d + a * c) * qfac,
        ],
        [
            2.0 * (b * c + a * d),
            a * a + c * c - b * b - d * d,
            2.0 * (c * d - a * b) * qfac,
        ],
        [
            2.0 * (b * d - a * c),
            2.0 * (c * d + a * b),
            (a * a + d * d - c * c - b * b) * qfac,
        ],
    ]
}

/// Encode a volume as an uncompressed single-file NIfTI-1 byte stream
pub fn encode_nifti(volume: &Volume) -> Vec<u8> {
    let mut header = vec![0_u8; VOX_OFFSET];
    let mut put = |offset: usize, bytes: &[u8]| {
        if let Some(target) = header.get_mut(offset..offset + bytes.len()) {
            target.copy_from_slice(bytes);
        }
    };

    let dims = volume.dims();
    let pixel_type = volume.pixel_type();
    put(0, &(HEADER_SIZE as i32).to_le_bytes());
    put(DIM, &3_i16.to_le_bytes());
    for (i, &d) in dims.iter().enumerate() {
        put(DIM + 2 * (i + 1), &(d as i16).to_le_bytes());
    }
    for i in 4..8 {
        put(DIM + 2 * i, &1_i16.to_le_bytes());
    }
    put(DATATYPE, &pixel_type.nifti_code().to_le_bytes());
    put(BITPIX, &((pixel_type.size() * 8) as i16).to_le_bytes());

    let spacing = volume.spacing();
    put(PIXDIM, &1.0_f32.to_le_bytes());
    for (i, &s) in spacing.iter().enumerate() {
        put(PIXDIM + 4 * (i + 1), &(s as f32).to_le_bytes());
    }
    put(VOX_OFFSET_FIELD, &(VOX_OFFSET as f32).to_le_bytes());
    put(SCL_SLOPE, &1.0_f32.to_le_bytes());
    put(XYZT_UNITS, &[UNITS_MM_SEC]);
    put(SFORM_CODE, &XFORM_SCANNER_ANAT.to_le_bytes());

    // LPS back to RAS: negate the x and y rows
    let direction = volume.direction();
    let origin = volume.origin();
    let signs = [-1.0, -1.0, 1.0];
    let rows = direction.iter().zip(origin).zip(signs);
    for (index, ((row, translation), sign)) in rows.enumerate() {
        let offset = SROW_X + 16 * index;
        for (col, (value, step)) in row.iter().zip(spacing).enumerate() {
            put(offset + 4 * col, &((sign * value * step) as f32).to_le_bytes());
        }
        put(offset + 12, &((sign * translation) as f32).to_le_bytes());
    }
    put(MAGIC, SINGLE_FILE_MAGIC);

    header.extend_from_slice(volume.data());
    header
}
