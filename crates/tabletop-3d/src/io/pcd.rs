use std::collections::HashMap;
use std::io::{BufRead, Read};
use std::path::Path;

use crate::pointcloud::PointCloud;

const MAX_POINT_STEP: usize = 1024;
const MAX_POINTS: usize = 50_000_000;
// buffers grow past this as records are actually read
const MAX_PREALLOC_POINTS: usize = 1 << 16;

/// Error types for the PCD module.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PcdError {
    /// Failed to read PCD file
    #[error("Failed to read PCD file")]
    Io(#[from] std::io::Error),

    /// Unsupported header
    #[error("Unsupported PCD header")]
    UnsupportedProperty,

    /// Malformed PCD header
    #[error("Malformed PCD header")]
    MalformedHeader,

    /// Invalid PCD file extension
    #[error("Invalid PCD file extension. Got:{0}")]
    InvalidFileExtension(String),
}

/// Pack an RGB triplet into the PCL `rgb` layout `0x00RRGGBB`.
#[inline]
pub fn pack_rgb(color: [u8; 3]) -> u32 {
    ((color[0] as u32) << 16) | ((color[1] as u32) << 8) | color[2] as u32
}

/// Unpack a PCL `rgb` value into an RGB triplet.
#[inline]
pub fn unpack_rgb(rgb: u32) -> [u8; 3] {
    [
        ((rgb >> 16) & 0xFF) as u8,
        ((rgb >> 8) & 0xFF) as u8,
        (rgb & 0xFF) as u8,
    ]
}

#[derive(Debug)]
struct PcdLayout {
    // byte offset of each field within a point record
    offsets: HashMap<String, usize>,
    point_step: usize,
    num_points: usize,
}

impl PcdLayout {
    fn offset(&self, name: &str) -> Option<usize> {
        self.offsets.get(name).copied()
    }

    fn initial_capacity(&self) -> usize {
        self.num_points.min(MAX_PREALLOC_POINTS)
    }
}

#[inline]
fn read_le_u32(buf: &[u8], offset: usize) -> Result<u32, PcdError> {
    let slice = buf
        .get(offset..offset + 4)
        .ok_or(PcdError::UnsupportedProperty)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(slice);
    Ok(u32::from_le_bytes(bytes))
}

#[inline]
fn read_le_f32(buf: &[u8], offset: usize) -> Result<f32, PcdError> {
    read_le_u32(buf, offset).map(f32::from_bits)
}

fn parse_values<T: std::str::FromStr>(
    it: std::str::SplitWhitespace<'_>,
) -> Result<Vec<T>, PcdError> {
    it.map(|v| v.parse::<T>().map_err(|_| PcdError::UnsupportedProperty))
        .collect()
}

fn parse_pcd_layout<R: BufRead>(reader: &mut R) -> Result<PcdLayout, PcdError> {
    let mut names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut types: Vec<char> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut num_points = 0usize;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(PcdError::MalformedHeader);
        }
        let line = line.trim();

        if line.starts_with("DATA") {
            if line != "DATA binary" {
                return Err(PcdError::UnsupportedProperty);
            }
            break;
        }

        let mut it = line.split_whitespace();
        match it.next() {
            Some("FIELDS") => names = it.map(String::from).collect(),
            Some("SIZE") => sizes = parse_values(it)?,
            Some("COUNT") => counts = parse_values(it)?,
            Some("POINTS") => {
                num_points = it
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or(PcdError::UnsupportedProperty)?;
            }
            Some("TYPE") => {
                types = it
                    .map(|v| v.chars().next().ok_or(PcdError::UnsupportedProperty))
                    .collect::<Result<_, _>>()?;
            }
            _ => {}
        }
    }

    if names.is_empty()
        || sizes.len() != names.len()
        || types.len() != names.len()
        || (!counts.is_empty() && counts.len() != names.len())
    {
        return Err(PcdError::UnsupportedProperty);
    }

    let mut offset = 0usize;
    let mut offsets = HashMap::new();

    for (i, name) in names.iter().enumerate() {
        // COUNT defaults to 1 when omitted
        let count = counts.get(i).copied().unwrap_or(1);
        let (size, kind) = (sizes[i], types[i]);

        let supported = match name.as_str() {
            "x" | "y" | "z" | "normal_x" | "normal_y" | "normal_z" => {
                size == 4 && count == 1 && kind == 'F'
            }
            "rgb" | "rgba" => size == 4 && count == 1 && matches!(kind, 'U' | 'I' | 'F'),
            _ => true,
        };
        if !supported {
            return Err(PcdError::UnsupportedProperty);
        }

        if offsets.insert(name.clone(), offset).is_some() {
            return Err(PcdError::MalformedHeader);
        }

        offset = size
            .checked_mul(count)
            .and_then(|bytes| offset.checked_add(bytes))
            .filter(|step| *step <= MAX_POINT_STEP)
            .ok_or(PcdError::MalformedHeader)?;
    }

    Ok(PcdLayout {
        offsets,
        point_step: offset,
        num_points,
    })
}

/// Read a binary PCD stream.
///
/// Supports XYZ and XYZRGB records, optionally with `normal_x/normal_y/normal_z`.
pub fn read_pcd_binary_from<R: BufRead>(reader: &mut R) -> Result<PointCloud, PcdError> {
    let layout = parse_pcd_layout(reader)?;

    if layout.num_points > MAX_POINTS || layout.point_step == 0 {
        return Err(PcdError::MalformedHeader);
    }

    let (Some(fx), Some(fy), Some(fz)) = (
        layout.offset("x"),
        layout.offset("y"),
        layout.offset("z"),
    ) else {
        return Err(PcdError::UnsupportedProperty);
    };
    let frgb = layout.offset("rgb").or_else(|| layout.offset("rgba"));
    let fnormal = match (
        layout.offset("normal_x"),
        layout.offset("normal_y"),
        layout.offset("normal_z"),
    ) {
        (Some(x), Some(y), Some(z)) => Some([x, y, z]),
        _ => None,
    };

    let mut buffer = vec![0u8; layout.point_step];
    let capacity = layout.initial_capacity();
    let mut points = Vec::with_capacity(capacity);
    let mut colors = frgb.map(|_| Vec::with_capacity(capacity));
    let mut normals = fnormal.map(|_| Vec::with_capacity(capacity));

    for _ in 0..layout.num_points {
        reader.read_exact(&mut buffer)?;

        points.push([
            read_le_f32(&buffer, fx)? as f64,
            read_le_f32(&buffer, fy)? as f64,
            read_le_f32(&buffer, fz)? as f64,
        ]);

        if let (Some(off), Some(colors)) = (frgb, colors.as_mut()) {
            colors.push(unpack_rgb(read_le_u32(&buffer, off)?));
        }

        if let (Some([ox, oy, oz]), Some(normals)) = (fnormal, normals.as_mut()) {
            normals.push([
                read_le_f32(&buffer, ox)? as f64,
                read_le_f32(&buffer, oy)? as f64,
                read_le_f32(&buffer, oz)? as f64,
            ]);
        }
    }

    Ok(PointCloud::new(points, colors, normals))
}

/// Read a binary PCD file.
///
/// # Arguments
/// * `path` - Path to a `.pcd` file.
///
/// # Returns
/// A [`PointCloud`] containing:
/// - 3D points (always)
/// - RGB colors (if present)
/// - Normals (if present)
pub fn read_pcd_binary(path: impl AsRef<Path>) -> Result<PointCloud, PcdError> {
    let Some(file_ext) = path.as_ref().extension() else {
        return Err(PcdError::InvalidFileExtension("".into()));
    };

    if file_ext != "pcd" {
        return Err(PcdError::InvalidFileExtension(
            file_ext.to_string_lossy().to_string(),
        ));
    }

    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    read_pcd_binary_from(&mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn xyzrgb_bytes(points: &[([f32; 3], [u8; 3])]) -> Vec<u8> {
        let mut data = format!(
            "# .PCD v0.7\nVERSION 0.7\nFIELDS x y z rgb\nSIZE 4 4 4 4\nTYPE F F F F\nCOUNT 1 1 1 1\nWIDTH {n}\nHEIGHT 1\nPOINTS {n}\nDATA binary\n",
            n = points.len()
        )
        .into_bytes();
        for (p, c) in points {
            for v in p {
                data.extend_from_slice(&v.to_le_bytes());
            }
            data.extend_from_slice(&pack_rgb(*c).to_le_bytes());
        }
        data
    }

    #[test]
    fn fails_on_ascii_or_non_binary() {
        let data = b"FIELDS x y z
SIZE 4 4 4
TYPE F F F
COUNT 1 1 1
POINTS 1
DATA ascii";
        let mut reader = Cursor::new(&data[..]);
        assert!(parse_pcd_layout(&mut reader).is_err());
    }

    #[test]
    fn rejects_wrong_type_for_xyz() {
        let data = b"FIELDS x y z
SIZE 4 4 4
TYPE I I I
COUNT 1 1 1
POINTS 5
DATA binary";
        let mut reader = Cursor::new(&data[..]);
        assert!(parse_pcd_layout(&mut reader).is_err());
    }

    #[test]
    fn reads_xyzrgb_records() -> Result<(), PcdError> {
        let bytes = xyzrgb_bytes(&[
            ([0.5, -0.25, 0.75], [255, 10, 0]),
            ([1.0, 2.0, 3.0], [1, 2, 3]),
        ]);
        let cloud = read_pcd_binary_from(&mut Cursor::new(bytes))?;
        assert_eq!(cloud.points(), &vec![[0.5, -0.25, 0.75], [1.0, 2.0, 3.0]]);
        assert_eq!(cloud.colors(), Some(&vec![[255, 10, 0], [1, 2, 3]]));
        assert!(cloud.normals().is_none());
        Ok(())
    }

    #[test]
    fn reads_file_and_checks_extension() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("frame.pcd");
        std::fs::File::create(&path)?.write_all(&xyzrgb_bytes(&[([0.0; 3], [0; 3])]))?;
        assert_eq!(read_pcd_binary(&path)?.len(), 1);

        let bad = dir.path().join("frame.ply");
        assert!(matches!(
            read_pcd_binary(bad),
            Err(PcdError::InvalidFileExtension(_))
        ));
        Ok(())
    }

    #[test]
    fn truncated_data_fails_without_trusting_point_count() -> Result<(), PcdError> {
        let header = format!(
            "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 1\nPOINTS {MAX_POINTS}\nDATA binary\n"
        );
        let mut data = header.into_bytes();
        data.extend_from_slice(&[0u8; 24]);

        let layout = parse_pcd_layout(&mut Cursor::new(&data[..]))?;
        assert_eq!(layout.num_points, MAX_POINTS);
        assert_eq!(layout.initial_capacity(), MAX_PREALLOC_POINTS);

        assert!(matches!(
            read_pcd_binary_from(&mut Cursor::new(data)),
            Err(PcdError::Io(_))
        ));
        Ok(())
    }

    #[test]
    fn rgb_packing() {
        assert_eq!(pack_rgb([0x12, 0x34, 0x56]), 0x0012_3456);
        assert_eq!(unpack_rgb(0xFF12_3456), [0x12, 0x34, 0x56]);
    }
}
