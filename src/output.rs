/*!
The per-fire output surface.

One [FireRecord] per detected fire pixel, and the CSV emission for a
granule. The CSV column names are the heritage names, kept verbatim so
downstream tooling keeps working; confidence is scaled to 0–100 on the way
out, everything else is written as stored.
*/

use crate::SwathFireResult;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// The heritage CSV header.
pub const CSV_HEADER: &str = "FRPline,FRPsample,FRPlats,FRPlons,FRPT21,FRPT31,FRPMeanT21,\
                              FRPMeanT31,FRPMeanDT,FRPMADT21,FRPMADT31,FRP_MAD_DT,FRPpower,\
                              FRP_AdjCloud,FRP_AdjWater,FRP_NumValid,FRP_confidence";

/// Everything reported about one detected fire pixel.
#[derive(Debug, Clone)]
pub struct FireRecord {
    /// Line (row) index in the uncropped granule.
    pub line: usize,

    /// Sample (column) index in the uncropped granule.
    pub sample: usize,

    /// Geolocation in degrees.
    pub lat: f32,
    pub lon: f32,

    /// Mid-IR and thermal-IR brightness temperatures at the pixel (K).
    pub t_mid: f32,
    pub t_lw: f32,

    /// Background means (K).
    pub t_mid_bg_mean: f32,
    pub t_lw_bg_mean: f32,
    pub delta_t_bg_mean: f32,

    /// Background mean absolute deviations (K).
    pub t_mid_bg_mad: f32,
    pub t_lw_bg_mad: f32,
    pub delta_t_bg_mad: f32,

    /// Fire radiative power, megawatts.
    pub power: f64,

    /// Immediately adjacent cloud and water pixels, and the valid
    /// background neighbor count.
    pub adjacent_cloud: i32,
    pub adjacent_water: i32,
    pub valid_neighbors: i32,

    /// Detection confidence in [0, 1].
    pub confidence: f64,

    /// Along-track × along-scan pixel area, km². Not part of the CSV
    /// surface, but archived.
    pub area: f64,
}

impl FireRecord {
    fn write_row<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.line,
            self.sample,
            self.lat,
            self.lon,
            self.t_mid,
            self.t_lw,
            self.t_mid_bg_mean,
            self.t_lw_bg_mean,
            self.delta_t_bg_mean,
            self.t_mid_bg_mad,
            self.t_lw_bg_mad,
            self.delta_t_bg_mad,
            self.power,
            self.adjacent_cloud,
            self.adjacent_water,
            self.valid_neighbors,
            self.confidence * 100.0,
        )
    }
}

/// Write the header and one row per record.
pub fn write_csv<W: Write>(records: &[FireRecord], out: &mut W) -> SwathFireResult<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for record in records {
        record.write_row(out)?;
    }

    Ok(())
}

/// Save records to a CSV file at `path`.
pub fn save_csv<P: AsRef<Path>>(records: &[FireRecord], path: P) -> SwathFireResult<()> {
    let f = File::create(path.as_ref())?;
    let mut buf = BufWriter::new(f);
    write_csv(records, &mut buf)?;

    Ok(())
}
