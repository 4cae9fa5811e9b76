//! MetaImage (`.mha` / `.mhd`) reading and writing

use crate::io::error::{FileSystemContext, Result, invalid_image, unsupported_image};
use crate::volume::voxels::{IDENTITY_DIRECTION, PixelType, Volume, swap_byte_order, transpose};
use flate2::read::ZlibDecoder;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;

const LOCAL_DATA: &str = "LOCAL";
const DATA_FILE_KEY: &str = "ElementDataFile";

/// Read a MetaImage file with local or detached voxel data
///
/// # Errors
///
/// Returns an error if the file cannot be read, the header is malformed, or the
/// image uses a feature outside the supported subset
pub fn read_metaimage(path: &Path) -> Result<Volume> {
    let bytes = std::fs::read(path).fs_context(path, "read MetaImage")?;
    let (fields, data_start) = parse_header(&bytes, path)?;

    let data_file = fields
        .get(DATA_FILE_KEY)
        .ok_or_else(|| invalid_image(path, &"missing ElementDataFile"))?;
    let payload = if data_file.as_str() == LOCAL_DATA {
        bytes.get(data_start..).unwrap_or_default().to_vec()
    } else {
        let detached = path
            .parent()
            .map_or_else(|| Path::new(data_file).to_path_buf(), |dir| dir.join(data_file));
        std::fs::read(&detached).fs_context(&detached, "read MetaImage data")?
    };

    decode_volume(&fields, payload, path)
}

/// Write a volume as an uncompressed, little-endian `.mha` file
///
/// # Errors
///
/// Returns an error if the file cannot be written
pub fn write_metaimage(volume: &Volume, path: &Path) -> Result<()> {
    let mut bytes = encode_header(volume).into_bytes();
    bytes.extend_from_slice(volume.data());
    std::fs::write(path, bytes).fs_context(path, "write MetaImage")
}

fn parse_header(bytes: &[u8], path: &Path) -> Result<(HashMap<String, String>, usize)> {
    let mut fields = HashMap::new();
    let mut position = 0;

    while position < bytes.len() {
        let remaining = bytes.get(position..).unwrap_or_default();
        let line_len = remaining
            .iter()
            .position(|&b| b == b'\n')
            .map_or(remaining.len(), |i| i + 1);
        let line = remaining.get(..line_len).unwrap_or_default();
        position += line_len;

        let text = std::str::from_utf8(line)
            .map_err(|_| invalid_image(path, &"header is not valid text"))?
            .trim();
        if text.is_empty() {
            continue;
        }
        let (key, value) = text
            .split_once('=')
            .ok_or_else(|| invalid_image(path, &format!("malformed header line '{text}'")))?;
        let key = key.trim().to_string();
        let is_data_file = key == DATA_FILE_KEY;
        fields.insert(key, value.trim().to_string());
        if is_data_file {
            return Ok((fields, position));
        }
    }

    Err(invalid_image(path, &"header has no ElementDataFile entry"))
}

fn field<'a>(fields: &'a HashMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| fields.get(*key)).map(String::as_str)
}

fn parse_numbers(value: &str, path: &Path, key: &str) -> Result<Vec<f64>> {
    value
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| invalid_image(path, &format!("{key} contains '{token}'")))
        })
        .collect()
}

fn parse_bool(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

fn decode_volume(fields: &HashMap<String, String>, payload: Vec<u8>, path: &Path) -> Result<Volume> {
    let ndims = field(fields, &["NDims"])
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(|| invalid_image(path, &"missing or invalid NDims"))?;
    if !(2..=3).contains(&ndims) {
        return Err(unsupported_image(path, &format!("NDims = {ndims}")));
    }

    let channels = field(fields, &["ElementNumberOfChannels"]).unwrap_or("1");
    if channels != "1" {
        return Err(unsupported_image(
            path,
            &format!("{channels} channels per element"),
        ));
    }

    let element_type = field(fields, &["ElementType"])
        .ok_or_else(|| invalid_image(path, &"missing ElementType"))?;
    let pixel_type = PixelType::from_meta_name(element_type)
        .ok_or_else(|| unsupported_image(path, &format!("ElementType = {element_type}")))?;

    let size_text =
        field(fields, &["DimSize"]).ok_or_else(|| invalid_image(path, &"missing DimSize"))?;
    let mut dims = [1_usize; 3];
    let sizes: Vec<usize> = size_text
        .split_whitespace()
        .map(str::parse::<usize>)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| invalid_image(path, &format!("DimSize = {size_text}")))?;
    if sizes.len() != ndims || sizes.contains(&0) {
        return Err(invalid_image(path, &format!("DimSize = {size_text}")));
    }
    dims.iter_mut().zip(&sizes).for_each(|(d, &s)| *d = s);

    let spacing = padded_vector(
        fields,
        &["ElementSpacing", "ElementSize"],
        ndims,
        1.0,
        path,
    )?;
    let origin = padded_vector(fields, &["Offset", "Position", "Origin"], ndims, 0.0, path)?;
    let direction = match field(fields, &["TransformMatrix", "Rotation", "Orientation"]) {
        Some(text) => {
            let values = parse_numbers(text, path, "TransformMatrix")?;
            if values.len() != ndims * ndims {
                return Err(invalid_image(path, &"TransformMatrix has the wrong size"));
            }
            // Stored axis by axis, so each chunk is one column of the direction
            let mut axes = IDENTITY_DIRECTION;
            for (axis, stored) in axes.iter_mut().zip(values.chunks_exact(ndims)) {
                axis.iter_mut()
                    .zip(stored)
                    .for_each(|(entry, &value)| *entry = value);
            }
            transpose(axes)
        }
        None => IDENTITY_DIRECTION,
    };

    let length = dims.iter().product::<usize>() * pixel_type.size();
    let mut data = if parse_bool(field(fields, &["CompressedData"])) {
        let mut decoded = Vec::with_capacity(length);
        ZlibDecoder::new(payload.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|e| invalid_image(path, &format!("zlib stream is corrupt: {e}")))?;
        decoded
    } else {
        payload
    };
    if data.len() < length {
        return Err(invalid_image(path, &"voxel data is truncated"));
    }
    data.truncate(length);
    if parse_bool(field(
        fields,
        &["BinaryDataByteOrderMSB", "ElementByteOrderMSB"],
    )) {
        swap_byte_order(&mut data, pixel_type.size());
    }

    let volume = Volume::new(dims, pixel_type, data)
        .ok_or_else(|| invalid_image(path, &"voxel count does not match dimensions"))?;
    Ok(volume
        .with_spacing(spacing)
        .with_origin(origin)
        .with_direction(direction))
}

fn padded_vector(
    fields: &HashMap<String, String>,
    keys: &[&str],
    ndims: usize,
    fill: f64,
    path: &Path,
) -> Result<[f64; 3]> {
    let mut vector = [fill; 3];
    if let Some(text) = field(fields, keys) {
        let values = parse_numbers(text, path, keys.first().copied().unwrap_or_default())?;
        if values.len() != ndims {
            return Err(invalid_image(
                path,
                &format!("{} = {text}", keys.first().copied().unwrap_or_default()),
            ));
        }
        vector.iter_mut().zip(values).for_each(|(v, value)| *v = value);
    }
    Ok(vector)
}

/// Orientation code naming the anatomical side each index axis points away from
pub fn anatomical_orientation(direction: &[[f64; 3]; 3]) -> String {
    const POSITIVE: [char; 3] = ['R', 'A', 'I'];
    const NEGATIVE: [char; 3] = ['L', 'P', 'S'];
    transpose(*direction)
        .iter()
        .map(|axis| {
            let dominant = axis.iter().zip(POSITIVE.iter().zip(NEGATIVE)).fold(
                ('R', 0.0_f64),
                |best, (&value, (&positive, negative))| {
                    if value.abs() > best.1.abs() {
                        (if value < 0.0 { negative } else { positive }, value)
                    } else {
                        best
                    }
                },
            );
            dominant.0
        })
        .collect()
}

fn join(values: impl IntoIterator<Item = f64>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the text header written ahead of local voxel data
pub fn encode_header(volume: &Volume) -> String {
    let direction = volume.direction();
    let [nx, ny, nz] = volume.dims();
    let transform = transpose(direction).into_iter().flatten();

    let mut header = String::new();
    let _ = writeln!(header, "ObjectType = Image");
    let _ = writeln!(header, "NDims = 3");
    let _ = writeln!(header, "BinaryData = True");
    let _ = writeln!(header, "BinaryDataByteOrderMSB = False");
    let _ = writeln!(header, "CompressedData = False");
    let _ = writeln!(header, "TransformMatrix = {}", join(transform));
    let _ = writeln!(header, "Offset = {}", join(volume.origin()));
    let _ = writeln!(header, "CenterOfRotation = 0 0 0");
    let _ = writeln!(
        header,
        "AnatomicalOrientation = {}",
        anatomical_orientation(&direction)
    );
    let _ = writeln!(header, "ElementSpacing = {}", join(volume.spacing()));
    let _ = writeln!(header, "DimSize = {nx} {ny} {nz}");
    let _ = writeln!(header, "ElementType = {}", volume.pixel_type().meta_name());
    let _ = writeln!(header, "{DATA_FILE_KEY} = {LOCAL_DATA}");
    header
}
