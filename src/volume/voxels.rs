//! In-memory scalar volume with physical geometry

use ndarray::Array3;
use num_traits::ToPrimitive;

/// Scalar voxel storage types understood by the codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    /// Unsigned 8-bit integer
    U8,
    /// Signed 8-bit integer
    I8,
    /// Unsigned 16-bit integer
    U16,
    /// Signed 16-bit integer
    I16,
    /// Unsigned 32-bit integer
    U32,
    /// Signed 32-bit integer
    I32,
    /// Unsigned 64-bit integer
    U64,
    /// Signed 64-bit integer
    I64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
}

impl PixelType {
    /// Size of one voxel in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// NIfTI-1 `datatype` code
    pub const fn nifti_code(self) -> i16 {
        match self {
            Self::U8 => 2,
            Self::I16 => 4,
            Self::I32 => 8,
            Self::F32 => 16,
            Self::F64 => 64,
            Self::I8 => 256,
            Self::U16 => 512,
            Self::U32 => 768,
            Self::I64 => 1024,
            Self::U64 => 1280,
        }
    }

    /// Pixel type for a NIfTI-1 `datatype` code
    pub const fn from_nifti_code(code: i16) -> Option<Self> {
        match code {
            2 => Some(Self::U8),
            4 => Some(Self::I16),
            8 => Some(Self::I32),
            16 => Some(Self::F32),
            64 => Some(Self::F64),
            256 => Some(Self::I8),
            512 => Some(Self::U16),
            768 => Some(Self::U32),
            1024 => Some(Self::I64),
            1280 => Some(Self::U64),
            _ => None,
        }
    }

    /// MetaImage `ElementType` name
    pub const fn meta_name(self) -> &'static str {
        match self {
            Self::U8 => "MET_UCHAR",
            Self::I8 => "MET_CHAR",
            Self::U16 => "MET_USHORT",
            Self::I16 => "MET_SHORT",
            Self::U32 => "MET_UINT",
            Self::I32 => "MET_INT",
            Self::U64 => "MET_ULONG_LONG",
            Self::I64 => "MET_LONG_LONG",
            Self::F32 => "MET_FLOAT",
            Self::F64 => "MET_DOUBLE",
        }
    }

    /// Pixel type for a MetaImage `ElementType` name
    pub fn from_meta_name(name: &str) -> Option<Self> {
        match name {
            "MET_UCHAR" => Some(Self::U8),
            "MET_CHAR" => Some(Self::I8),
            "MET_USHORT" => Some(Self::U16),
            "MET_SHORT" => Some(Self::I16),
            "MET_UINT" | "MET_ULONG" => Some(Self::U32),
            "MET_INT" | "MET_LONG" => Some(Self::I32),
            "MET_ULONG_LONG" => Some(Self::U64),
            "MET_LONG_LONG" => Some(Self::I64),
            "MET_FLOAT" => Some(Self::F32),
            "MET_DOUBLE" => Some(Self::F64),
            _ => None,
        }
    }
}

/// Identity direction matrix
pub const IDENTITY_DIRECTION: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Swap rows and columns; turns a direction matrix into its per-axis vectors
pub const fn transpose(matrix: [[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let [[a, b, c], [d, e, f], [g, h, i]] = matrix;
    [[a, d, g], [b, e, h], [c, f, i]]
}

/// A 3-D scalar image in LPS physical space
///
/// Voxels are stored as little-endian bytes with x varying fastest. The
/// direction matrix is row-major and its columns are the physical directions
/// of the x, y and z index axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    dims: [usize; 3],
    spacing: [f64; 3],
    origin: [f64; 3],
    direction: [[f64; 3]; 3],
    pixel_type: PixelType,
    data: Vec<u8>,
}

impl Volume {
    /// Create a volume with unit spacing, zero origin and identity direction
    ///
    /// Returns `None` when the byte count does not match the dimensions
    pub fn new(dims: [usize; 3], pixel_type: PixelType, data: Vec<u8>) -> Option<Self> {
        let expected = dims
            .iter()
            .try_fold(pixel_type.size(), |acc, &d| acc.checked_mul(d))?;
        (data.len() == expected).then_some(Self {
            dims,
            spacing: [1.0; 3],
            origin: [0.0; 3],
            direction: IDENTITY_DIRECTION,
            pixel_type,
            data,
        })
    }

    /// Replace the voxel spacing
    #[must_use]
    pub const fn with_spacing(mut self, spacing: [f64; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    /// Replace the physical origin
    #[must_use]
    pub const fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    /// Replace the direction matrix
    #[must_use]
    pub const fn with_direction(mut self, direction: [[f64; 3]; 3]) -> Self {
        self.direction = direction;
        self
    }

    /// Extent along x, y and z
    pub const fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Voxel spacing in millimetres
    pub const fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// Physical position of the first voxel
    pub const fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// Direction cosines, row-major
    pub const fn direction(&self) -> [[f64; 3]; 3] {
        self.direction
    }

    /// Voxel storage type
    pub const fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Raw little-endian voxel bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of voxels
    pub fn voxel_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Physical volume of one voxel in cubic millimetres
    pub fn voxel_volume_mm3(&self) -> f64 {
        self.spacing.iter().product()
    }

    /// Decode every voxel to `f64`, indexed as `[z, y, x]`
    pub fn to_array(&self) -> Array3<f64> {
        let values: Vec<f64> = self.with_values(|values| values.collect());
        let [nx, ny, nz] = self.dims;
        Array3::from_shape_vec((nz, ny, nx), values)
            .unwrap_or_else(|_| Array3::zeros((nz, ny, nx)))
    }

    /// Count voxels whose decoded value satisfies `predicate`
    pub fn count_voxels(&self, mut predicate: impl FnMut(f64) -> bool) -> usize {
        self.with_values(|values| values.filter(|&value| predicate(value)).count())
    }

    /// Run `consume` over the voxel values in storage order
    fn with_values<R>(&self, consume: impl FnOnce(&mut dyn Iterator<Item = f64>) -> R) -> R {
        match self.pixel_type {
            PixelType::U8 => consume(&mut decode::<u8>(&self.data)),
            PixelType::I8 => consume(&mut decode::<i8>(&self.data)),
            PixelType::U16 => consume(&mut decode::<u16>(&self.data)),
            PixelType::I16 => consume(&mut decode::<i16>(&self.data)),
            PixelType::U32 => consume(&mut decode::<u32>(&self.data)),
            PixelType::I32 => consume(&mut decode::<i32>(&self.data)),
            PixelType::U64 => consume(&mut decode::<u64>(&self.data)),
            PixelType::I64 => consume(&mut decode::<i64>(&self.data)),
            PixelType::F32 => consume(&mut decode::<f32>(&self.data)),
            PixelType::F64 => consume(&mut decode::<f64>(&self.data)),
        }
    }
}

/// Scalars that can be read from little-endian bytes
trait LittleEndianScalar: ToPrimitive + Sized {
    const SIZE: usize;

    fn from_le_slice(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_little_endian_scalar {
    ($($ty:ty),*) => {
        $(
            impl LittleEndianScalar for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_le_slice(bytes: &[u8]) -> Option<Self> {
                    bytes.try_into().ok().map(<$ty>::from_le_bytes)
                }
            }
        )*
    };
}

impl_little_endian_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

fn decode<T: LittleEndianScalar>(data: &[u8]) -> impl Iterator<Item = f64> + '_ {
    data.chunks_exact(T::SIZE).map(|chunk| {
        T::from_le_slice(chunk)
            .and_then(|value| value.to_f64())
            .unwrap_or(0.0)
    })
}

/// Reverse the byte order of every element in place
pub fn swap_byte_order(data: &mut [u8], element_size: usize) {
    if element_size > 1 {
        for element in data.chunks_exact_mut(element_size) {
            element.reverse();
        }
    }
}
