/*!
Reader for pre-decoded swath granule containers.

Decoding the native archive format (calibration, geolocation) happens
upstream; the detector consumes a flat little-endian container holding the
co-registered layers already converted to brightness temperatures and
scaled reflectances. A container may also arrive zip-archived, in which
case the first `.swt` entry is used.

Container layout:

```text
magic    4 bytes   b"SWTH"
version  u8        1
rows     u32 LE
cols     u32 LE
layers   u16 LE    layer count
per layer:
  name   u8 length + bytes, one of the heritage layer names
  kind   u8         0 = f32, 1 = i32, 2 = u8
  cells  rows × cols, little-endian, row-major
```

Unknown layer names are skipped; unknown cell kinds are an error because
the payload length would be ambiguous.
*/

use crate::{error::DecodeError, granule::Granule, grid::Grid, SwathFireResult};
use rustc_hash::FxHashMap;
use std::{
    fs::File,
    io::{Cursor, Read},
    path::Path,
    str::FromStr,
};
use strum::IntoEnumIterator;

const MAGIC: &[u8; 4] = b"SWTH";
const VERSION: u8 = 1;

/// The layers a granule container must provide, by heritage name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
pub enum Layer {
    #[strum(serialize = "BAND21")]
    MidIrAlt,
    #[strum(serialize = "BAND22")]
    MidIr,
    #[strum(serialize = "BAND31")]
    ThermalIr,
    #[strum(serialize = "BAND32")]
    ThermalIr2,
    #[strum(serialize = "BAND1x1k")]
    VisRed,
    #[strum(serialize = "BAND2x1k")]
    VisNir,
    #[strum(serialize = "BAND7x1k")]
    Swir,
    #[strum(serialize = "LANDMASK")]
    LandMask,
    #[strum(serialize = "LAT")]
    Latitude,
    #[strum(serialize = "LON")]
    Longitude,
    #[strum(serialize = "SolarZenith")]
    SolarZenith,
    #[strum(serialize = "SolarAzimuth")]
    SolarAzimuth,
    #[strum(serialize = "SensorZenith")]
    SensorZenith,
    #[strum(serialize = "SensorAzimuth")]
    SensorAzimuth,
}

enum LayerData {
    F32(Grid<f32>),
    I32(Grid<i32>),
    U8(Grid<u8>),
}

impl Granule {
    /// Open a granule container, zip-archived or flat.
    pub fn open<P: AsRef<Path>>(path: P) -> SwathFireResult<Self> {
        let path = path.as_ref();

        let bytes = read_container_bytes(path)?;
        let name = granule_name_of(path);
        let scan_time = path
            .file_name()
            .and_then(|f| crate::scan_time_from_file_name(&f.to_string_lossy()));

        parse_container(&bytes, name, scan_time)
    }
}

/// Does this path look like a granule container this crate can open?
pub fn is_container_path(path: &Path) -> bool {
    match path.extension().map(|ext| ext.to_string_lossy().to_lowercase()) {
        Some(ext) => ext == "swt" || ext == "zip",
        None => false,
    }
}

/// The granule identifier for a container path: the file name with the
/// container extensions stripped.
pub fn granule_name_of(path: &Path) -> String {
    let mut name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    if name.ends_with(".swt") {
        name.truncate(name.len() - 4);
    }

    name
}

fn read_container_bytes(path: &Path) -> SwathFireResult<Vec<u8>> {
    let zipped = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase() == "zip")
        .unwrap_or(false);

    if zipped {
        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.name().ends_with(".swt") {
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut bytes)?;
                return Ok(bytes);
            }
        }

        Err(DecodeError::new(format!("no .swt entry in {}", path.display())).into())
    } else {
        let mut bytes = vec![];
        File::open(path)?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

fn parse_container(
    bytes: &[u8],
    name: String,
    scan_time: Option<chrono::NaiveDateTime>,
) -> SwathFireResult<Granule> {
    let mut cursor = Cursor::new(bytes);

    let mut magic = [0_u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(DecodeError::new(format!("{}: not a swath container", name)).into());
    }

    let version = read_u8(&mut cursor)?;
    if version != VERSION {
        return Err(
            DecodeError::new(format!("{}: unsupported container version {}", name, version))
                .into(),
        );
    }

    let rows = read_u32(&mut cursor)? as usize;
    let cols = read_u32(&mut cursor)? as usize;
    if rows == 0 || cols == 0 {
        return Err(DecodeError::new(format!("{}: degenerate grid shape", name)).into());
    }

    let num_layers = read_u16(&mut cursor)? as usize;

    let mut layers: FxHashMap<Layer, LayerData> = FxHashMap::default();
    for _ in 0..num_layers {
        let name_len = read_u8(&mut cursor)? as usize;
        let mut name_bytes = vec![0_u8; name_len];
        cursor.read_exact(&mut name_bytes)?;
        let layer_name = std::str::from_utf8(&name_bytes)
            .map_err(|_| DecodeError::new(format!("{}: layer name is not UTF-8", name)))?;
        let layer = Layer::from_str(layer_name).ok();

        let kind = read_u8(&mut cursor)?;
        let data = match kind {
            0 => LayerData::F32(read_f32_grid(&mut cursor, rows, cols)?),
            1 => LayerData::I32(read_i32_grid(&mut cursor, rows, cols)?),
            2 => LayerData::U8(read_u8_grid(&mut cursor, rows, cols)?),
            other => {
                return Err(DecodeError::new(format!(
                    "{}: unknown cell kind {} in layer {}",
                    name, other, layer_name
                ))
                .into())
            }
        };

        if let Some(layer) = layer {
            layers.insert(layer, data);
        }
    }

    for required in Layer::iter() {
        if !layers.contains_key(&required) {
            return Err(
                DecodeError::new(format!("{}: missing layer {}", name, required)).into(),
            );
        }
    }

    Ok(Granule {
        name,
        scan_time,
        t_mid_alt: take_f32(&mut layers, Layer::MidIrAlt)?,
        t_mid: take_f32(&mut layers, Layer::MidIr)?,
        t_lw: take_f32(&mut layers, Layer::ThermalIr)?,
        t_lw2: take_f32(&mut layers, Layer::ThermalIr2)?,
        r_vis1: take_i32(&mut layers, Layer::VisRed)?,
        r_vis2: take_i32(&mut layers, Layer::VisNir)?,
        r_swir: take_i32(&mut layers, Layer::Swir)?,
        land_mask: take_u8(&mut layers, Layer::LandMask)?,
        sol_zen: take_f32(&mut layers, Layer::SolarZenith)?,
        sol_az: take_f32(&mut layers, Layer::SolarAzimuth)?,
        sen_zen: take_f32(&mut layers, Layer::SensorZenith)?,
        sen_az: take_f32(&mut layers, Layer::SensorAzimuth)?,
        lat: take_f32(&mut layers, Layer::Latitude)?,
        lon: take_f32(&mut layers, Layer::Longitude)?,
    })
}

fn take_f32(layers: &mut FxHashMap<Layer, LayerData>, layer: Layer) -> SwathFireResult<Grid<f32>> {
    match layers.remove(&layer) {
        Some(LayerData::F32(grid)) => Ok(grid),
        _ => Err(DecodeError::new(format!("layer {} must hold f32 cells", layer)).into()),
    }
}

fn take_i32(layers: &mut FxHashMap<Layer, LayerData>, layer: Layer) -> SwathFireResult<Grid<i32>> {
    match layers.remove(&layer) {
        Some(LayerData::I32(grid)) => Ok(grid),
        _ => Err(DecodeError::new(format!("layer {} must hold i32 cells", layer)).into()),
    }
}

fn take_u8(layers: &mut FxHashMap<Layer, LayerData>, layer: Layer) -> SwathFireResult<Grid<u8>> {
    match layers.remove(&layer) {
        Some(LayerData::U8(grid)) => Ok(grid),
        _ => Err(DecodeError::new(format!("layer {} must hold u8 cells", layer)).into()),
    }
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> SwathFireResult<u8> {
    let mut buf = [0_u8; 1];
    cursor.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> SwathFireResult<u16> {
    let mut buf = [0_u8; 2];
    cursor.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> SwathFireResult<u32> {
    let mut buf = [0_u8; 4];
    cursor.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f32_grid(cursor: &mut Cursor<&[u8]>, rows: usize, cols: usize) -> SwathFireResult<Grid<f32>> {
    let mut buf = vec![0_u8; rows * cols * 4];
    cursor.read_exact(&mut buf)?;

    let vals = buf
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(Grid::from_vec(rows, cols, vals))
}

fn read_i32_grid(cursor: &mut Cursor<&[u8]>, rows: usize, cols: usize) -> SwathFireResult<Grid<i32>> {
    let mut buf = vec![0_u8; rows * cols * 4];
    cursor.read_exact(&mut buf)?;

    let vals = buf
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(Grid::from_vec(rows, cols, vals))
}

fn read_u8_grid(cursor: &mut Cursor<&[u8]>, rows: usize, cols: usize) -> SwathFireResult<Grid<u8>> {
    let mut vals = vec![0_u8; rows * cols];
    cursor.read_exact(&mut vals)?;

    Ok(Grid::from_vec(rows, cols, vals))
}

#[cfg(test)]
mod test {
    use super::*;

    fn push_layer_f32(bytes: &mut Vec<u8>, name: &str, cells: &[f32]) {
        bytes.push(name.len() as u8);
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);
        for cell in cells {
            bytes.extend_from_slice(&cell.to_le_bytes());
        }
    }

    fn push_layer_i32(bytes: &mut Vec<u8>, name: &str, cells: &[i32]) {
        bytes.push(name.len() as u8);
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(1);
        for cell in cells {
            bytes.extend_from_slice(&cell.to_le_bytes());
        }
    }

    fn push_layer_u8(bytes: &mut Vec<u8>, name: &str, cells: &[u8]) {
        bytes.push(name.len() as u8);
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(2);
        bytes.extend_from_slice(cells);
    }

    fn test_container() -> Vec<u8> {
        let mut bytes = vec![];
        bytes.extend_from_slice(MAGIC);
        bytes.push(VERSION);
        bytes.extend_from_slice(&2_u32.to_le_bytes());
        bytes.extend_from_slice(&2_u32.to_le_bytes());
        bytes.extend_from_slice(&14_u16.to_le_bytes());

        let f = [290.0_f32, 291.0, 292.0, 293.0];
        for name in [
            "BAND21",
            "BAND22",
            "BAND31",
            "BAND32",
            "LAT",
            "LON",
            "SolarZenith",
            "SolarAzimuth",
            "SensorZenith",
            "SensorAzimuth",
        ] {
            push_layer_f32(&mut bytes, name, &f);
        }

        let i = [100_i32, 110, 120, 130];
        for name in ["BAND1x1k", "BAND2x1k", "BAND7x1k"] {
            push_layer_i32(&mut bytes, name, &i);
        }

        push_layer_u8(&mut bytes, "LANDMASK", &[1, 1, 0, 1]);

        bytes
    }

    #[test]
    fn test_parse_container() {
        let bytes = test_container();
        let granule = parse_container(&bytes, "TEST.A2016257.2055".to_string(), None).unwrap();

        assert_eq!(granule.rows(), 2);
        assert_eq!(granule.cols(), 2);
        assert_eq!(granule.t_mid.get(0, 1), 291.0);
        assert_eq!(granule.r_vis2.get(1, 1), 130);
        assert_eq!(granule.land_mask.get(1, 0), 0);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = test_container();
        bytes[0] = b'X';

        assert!(parse_container(&bytes, "bad".to_string(), None).is_err());
    }

    #[test]
    fn test_missing_layer_rejected() {
        let mut bytes = vec![];
        bytes.extend_from_slice(MAGIC);
        bytes.push(VERSION);
        bytes.extend_from_slice(&2_u32.to_le_bytes());
        bytes.extend_from_slice(&2_u32.to_le_bytes());
        bytes.extend_from_slice(&1_u16.to_le_bytes());
        push_layer_f32(&mut bytes, "BAND22", &[290.0, 291.0, 292.0, 293.0]);

        let err = parse_container(&bytes, "partial".to_string(), None).unwrap_err();
        assert!(err.to_string().contains("missing layer"));
    }

    #[test]
    fn test_truncated_container_rejected() {
        let bytes = test_container();
        assert!(parse_container(&bytes[..bytes.len() / 2], "short".to_string(), None).is_err());
    }

    #[test]
    fn test_unknown_layers_skipped() {
        let mut bytes = test_container();
        // Splice in an extra, unknown layer and bump the count.
        let count_offset = 4 + 1 + 4 + 4;
        bytes[count_offset] = 15;
        push_layer_f32(&mut bytes, "Range", &[1.0, 2.0, 3.0, 4.0]);

        let granule = parse_container(&bytes, "extra".to_string(), None).unwrap();
        assert_eq!(granule.rows(), 2);
    }

    #[test]
    fn test_container_paths() {
        assert!(is_container_path(Path::new("/data/g.swt")));
        assert!(is_container_path(Path::new("/data/g.swt.zip")));
        assert!(!is_container_path(Path::new("/data/notes.txt")));
        assert!(!is_container_path(Path::new("/data/granule")));

        assert_eq!(
            granule_name_of(Path::new("/data/MOD.A2016257.2055.swt")),
            "MOD.A2016257.2055"
        );
        assert_eq!(
            granule_name_of(Path::new("/data/MOD.A2016257.2055.swt.zip")),
            "MOD.A2016257.2055"
        );
    }
}
