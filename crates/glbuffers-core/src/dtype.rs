//! Element data type definitions

/// Supported element kinds, keyed by their format-string code letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl DType {
    /// Size in bytes
    pub const fn size(&self) -> usize {
        match self {
            DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int32 | DType::UInt32 | DType::Float32 => 4,
            DType::Float64 => 8,
        }
    }

    /// Format-string code letter
    pub const fn code(&self) -> char {
        match self {
            DType::Int8 => 'b',
            DType::UInt8 => 'B',
            DType::Int16 => 's',
            DType::UInt16 => 'S',
            DType::Int32 => 'i',
            DType::UInt32 => 'I',
            DType::Float32 => 'f',
            DType::Float64 => 'd',
        }
    }

    /// Convert from a format-string code letter
    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'b' => Some(DType::Int8),
            'B' => Some(DType::UInt8),
            's' => Some(DType::Int16),
            'S' => Some(DType::UInt16),
            'i' => Some(DType::Int32),
            'I' => Some(DType::UInt32),
            'f' => Some(DType::Float32),
            'd' => Some(DType::Float64),
            _ => None,
        }
    }

    /// Encode one value into `out` (host endian, `out.len() == self.size()`)
    pub fn write(&self, value: f64, out: &mut [u8]) {
        match self {
            DType::Int8 => out.copy_from_slice(&(value as i8).to_ne_bytes()),
            DType::UInt8 => out.copy_from_slice(&(value as u8).to_ne_bytes()),
            DType::Int16 => out.copy_from_slice(&(value as i16).to_ne_bytes()),
            DType::UInt16 => out.copy_from_slice(&(value as u16).to_ne_bytes()),
            DType::Int32 => out.copy_from_slice(&(value as i32).to_ne_bytes()),
            DType::UInt32 => out.copy_from_slice(&(value as u32).to_ne_bytes()),
            DType::Float32 => out.copy_from_slice(&(value as f32).to_ne_bytes()),
            DType::Float64 => out.copy_from_slice(&value.to_ne_bytes()),
        }
    }

    /// Decode one value from `raw` (`raw.len() == self.size()`)
    pub fn read(&self, raw: &[u8]) -> f64 {
        match self {
            DType::Int8 => i8::from_ne_bytes([raw[0]]) as f64,
            DType::UInt8 => u8::from_ne_bytes([raw[0]]) as f64,
            DType::Int16 => i16::from_ne_bytes([raw[0], raw[1]]) as f64,
            DType::UInt16 => u16::from_ne_bytes([raw[0], raw[1]]) as f64,
            DType::Int32 => i32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64,
            DType::UInt32 => u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64,
            DType::Float32 => f32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64,
            DType::Float64 => f64::from_ne_bytes([
                raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
            ]),
        }
    }
}
