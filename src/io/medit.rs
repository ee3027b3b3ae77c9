//! Medit `.mesh` reader (TetGen `-g` output).
//!
//! # Supported format
//! - ASCII files with `MeshVersionFormatted`, `Dimension 3`, `Vertices` and
//!   `Tetrahedra` sections; each record ends with a reference number.
//! - `Edges`, `Triangles` and `Corners` sections are skipped.
//! - Keywords and numbers are whitespace separated and may span lines; `#`
//!   starts a comment that runs to the end of the line.

use crate::data::mesh::VolumeMesh;
use crate::io::VolumeMeshReader;
use crate::mesh_error::BoraError;
use std::io::Read;

#[derive(Debug, Default, Clone)]
pub struct MeditReader;

struct Tokens<'a> {
    inner: std::vec::IntoIter<&'a str>,
}

impl<'a> Tokens<'a> {
    fn new(contents: &'a str) -> Self {
        let tokens: Vec<&str> = contents
            .lines()
            .map(|l| l.split('#').next().unwrap_or(""))
            .flat_map(str::split_whitespace)
            .collect();
        Tokens {
            inner: tokens.into_iter(),
        }
    }

    fn next_token(&mut self, what: &str) -> Result<&'a str, BoraError> {
        self.inner
            .next()
            .ok_or_else(|| BoraError::Parse(format!("unexpected end of file, expected {what}")))
    }

    fn count(&mut self, section: &str) -> Result<usize, BoraError> {
        let raw = self.next_token(section)?;
        raw.parse::<usize>()
            .map_err(|_| BoraError::Parse(format!("invalid {section} count: {raw}")))
    }

    fn coord(&mut self) -> Result<f64, BoraError> {
        let raw = self.next_token("coordinate")?;
        raw.parse::<f64>()
            .map_err(|_| BoraError::Parse(format!("invalid coordinate: {raw}")))
    }

    fn index(&mut self, n_nodes: usize) -> Result<usize, BoraError> {
        let raw = self.next_token("vertex index")?;
        let i = raw
            .parse::<usize>()
            .map_err(|_| BoraError::Parse(format!("invalid vertex index: {raw}")))?;
        if i == 0 || i > n_nodes {
            return Err(BoraError::Parse(format!(
                "vertex index {i} out of range 1..={n_nodes}"
            )));
        }
        Ok(i - 1)
    }

    fn skip(&mut self, n: usize, what: &str) -> Result<(), BoraError> {
        for _ in 0..n {
            self.next_token(what)?;
        }
        Ok(())
    }
}

impl VolumeMeshReader for MeditReader {
    fn read<R: Read>(&self, mut reader: R) -> Result<VolumeMesh, BoraError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        let mut tokens = Tokens::new(&contents);
        let mut mesh = VolumeMesh::default();
        let mut dimension = 3usize;
        let mut seen_tetrahedra = false;

        while let Some(keyword) = tokens.inner.next() {
            match keyword {
                "MeshVersionFormatted" => {
                    tokens.next_token("version")?;
                }
                "Dimension" => {
                    dimension = tokens.count("Dimension")?;
                    if dimension != 3 {
                        return Err(BoraError::Parse(format!(
                            "unsupported dimension {dimension}"
                        )));
                    }
                }
                "Vertices" => {
                    let n = tokens.count("Vertices")?;
                    mesh.nodes.reserve(n);
                    for _ in 0..n {
                        let p = [tokens.coord()?, tokens.coord()?, tokens.coord()?];
                        tokens.next_token("vertex reference")?;
                        mesh.nodes.push(p);
                    }
                }
                "Tetrahedra" => {
                    let n = tokens.count("Tetrahedra")?;
                    let n_nodes = mesh.nodes.len();
                    mesh.tetrahedra.reserve(n);
                    for _ in 0..n {
                        let t = [
                            tokens.index(n_nodes)?,
                            tokens.index(n_nodes)?,
                            tokens.index(n_nodes)?,
                            tokens.index(n_nodes)?,
                        ];
                        tokens.next_token("tetrahedron reference")?;
                        mesh.tetrahedra.push(t);
                    }
                    seen_tetrahedra = true;
                }
                "Edges" => {
                    let n = tokens.count("Edges")?;
                    tokens.skip(3 * n, "edge record")?;
                }
                "Triangles" => {
                    let n = tokens.count("Triangles")?;
                    tokens.skip(4 * n, "triangle record")?;
                }
                "Corners" | "RequiredVertices" => {
                    let n = tokens.count(keyword)?;
                    tokens.skip(n, "vertex index")?;
                }
                "End" => break,
                other => {
                    return Err(BoraError::Parse(format!("unknown keyword `{other}`")));
                }
            }
        }
        if !seen_tetrahedra {
            return Err(BoraError::Parse("missing Tetrahedra section".into()));
        }
        log::debug!(
            "medit: {} vertices, {} tetrahedra (dimension {dimension})",
            mesh.nodes.len(),
            mesh.tetrahedra.len()
        );
        Ok(mesh)
    }
}
