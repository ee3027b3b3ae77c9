//! Netgen `.vol` reader.
//!
//! # Supported format
//! - ASCII `mesh3d` files. Only the `points` and `volumeelements` sections
//!   are read; every other section is skipped.
//! - A `volumeelements` record is `matnr np p1 .. pnp`; only 4-node
//!   (tetrahedral) elements are accepted.
//! - Point indices are 1-based.

use crate::data::mesh::VolumeMesh;
use crate::io::VolumeMeshReader;
use crate::mesh_error::BoraError;
use std::io::Read;

#[derive(Debug, Default, Clone)]
pub struct NetgenVolReader;

impl NetgenVolReader {
    fn parse_count(line: Option<&str>, section: &str) -> Result<usize, BoraError> {
        let line = line.ok_or_else(|| BoraError::Parse(format!("missing {section} count")))?;
        line.trim()
            .parse::<usize>()
            .map_err(|_| BoraError::Parse(format!("invalid {section} count: {line}")))
    }

    fn parse_f64(raw: &str) -> Result<f64, BoraError> {
        raw.parse::<f64>()
            .map_err(|_| BoraError::Parse(format!("invalid coordinate: {raw}")))
    }

    fn parse_usize(raw: &str) -> Result<usize, BoraError> {
        raw.parse::<usize>()
            .map_err(|_| BoraError::Parse(format!("invalid integer: {raw}")))
    }
}

impl VolumeMeshReader for NetgenVolReader {
    fn read<R: Read>(&self, mut reader: R) -> Result<VolumeMesh, BoraError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        let mut lines = contents.lines();
        let mut points: Vec<[f64; 3]> = Vec::new();
        let mut elements: Vec<[usize; 4]> = Vec::new();
        let mut seen_points = false;

        while let Some(line) = lines.next() {
            match line.trim() {
                "points" => {
                    let n = Self::parse_count(lines.next(), "points")?;
                    points.reserve(n);
                    for _ in 0..n {
                        let l = lines.next().ok_or_else(|| {
                            BoraError::Parse("unexpected end of point list".into())
                        })?;
                        let xyz: Vec<f64> = l
                            .split_whitespace()
                            .map(Self::parse_f64)
                            .collect::<Result<_, _>>()?;
                        if xyz.len() < 3 {
                            return Err(BoraError::Parse(format!("short point record: {l}")));
                        }
                        points.push([xyz[0], xyz[1], xyz[2]]);
                    }
                    seen_points = true;
                }
                "volumeelements" => {
                    let n = Self::parse_count(lines.next(), "volumeelements")?;
                    elements.reserve(n);
                    for _ in 0..n {
                        let l = lines.next().ok_or_else(|| {
                            BoraError::Parse("unexpected end of element list".into())
                        })?;
                        let fields: Vec<usize> = l
                            .split_whitespace()
                            .map(Self::parse_usize)
                            .collect::<Result<_, _>>()?;
                        if fields.len() < 6 || fields[1] != 4 {
                            return Err(BoraError::Parse(format!(
                                "unsupported volume element: {l}"
                            )));
                        }
                        elements.push([fields[2], fields[3], fields[4], fields[5]]);
                    }
                }
                "endmesh" => break,
                _ => {}
            }
        }
        if !seen_points {
            return Err(BoraError::Parse("missing points section".into()));
        }
        let n_nodes = points.len();
        let tetrahedra = elements
            .into_iter()
            .map(|e| {
                let mut t = [0usize; 4];
                for (k, &i) in e.iter().enumerate() {
                    if i == 0 || i > n_nodes {
                        return Err(BoraError::Parse(format!(
                            "point index {i} out of range 1..={n_nodes}"
                        )));
                    }
                    t[k] = i - 1;
                }
                Ok(t)
            })
            .collect::<Result<Vec<_>, BoraError>>()?;
        log::debug!("netgen: {n_nodes} points, {} tetrahedra", tetrahedra.len());
        Ok(VolumeMesh {
            nodes: points,
            tetrahedra,
        })
    }
}
