use super::traits::{TextInput, TextOutput};
use crate::core::estimator::Profile;
use std::io::{self, BufRead, Write};
use thiserror::Error;

pub const PROFILE_HEADER: &str = "   e1-e2       dGa       dGb       dGg";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: invalid number '{value}'")]
    Parse { line: usize, value: String },
}

/// Reaction coordinate and free energy read back from a profile file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileCurve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ProfileCurve {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

pub struct ProfileFile;

impl TextInput for ProfileFile {
    type Output = ProfileCurve;
    type Error = ProfileError;

    /// Takes the first column as the coordinate and the last one as the free energy,
    /// skipping the header line.
    fn read_from(reader: &mut impl BufRead) -> Result<ProfileCurve, ProfileError> {
        let mut curve = ProfileCurve::default();
        for (line_num, line_res) in reader.lines().enumerate().skip(1) {
            let line = line_res?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
                continue;
            };
            if first.starts_with('#') {
                continue;
            }
            let parse = |token: &str| {
                token.parse::<f64>().map_err(|_| ProfileError::Parse {
                    line: line_num + 1,
                    value: token.to_string(),
                })
            };
            curve.x.push(parse(first)?);
            curve.y.push(parse(last)?);
        }
        Ok(curve)
    }
}

impl TextOutput for ProfileFile {
    type Input = Profile;
    type Error = ProfileError;

    fn write_to(profile: &Profile, writer: &mut impl Write) -> Result<(), ProfileError> {
        writeln!(writer, "{PROFILE_HEADER}")?;
        for i in 0..profile.len() {
            writeln!(
                writer,
                "{:>8.3}  {:>8.3}  {:>8.3}  {:>8.3}",
                profile.coordinate[i], profile.reactant[i], profile.product[i], profile.ground[i]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn sample() -> Profile {
        Profile {
            coordinate: vec![-10.25, 0.5],
            reactant: vec![0.0, 12.3456],
            product: vec![20.0, 1.0],
            ground: vec![0.0, -2.5],
        }
    }

    #[test]
    fn write_to_formats_fixed_width_columns() {
        let mut out = Vec::new();
        ProfileFile::write_to(&sample(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], PROFILE_HEADER);
        assert_eq!(lines[1], " -10.250     0.000    20.000     0.000");
        assert_eq!(lines[2], "   0.500    12.346     1.000    -2.500");
    }

    #[test]
    fn written_profile_reads_back_coordinate_and_ground_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.dat");
        ProfileFile::write_to_path(&sample(), &path).unwrap();
        let curve = ProfileFile::read_from_path(&path).unwrap();
        assert_eq!(curve.x, vec![-10.25, 0.5]);
        assert_eq!(curve.y, vec![0.0, -2.5]);
    }

    #[test]
    fn read_from_skips_blank_and_comment_rows() {
        let text = "x y\n\n# note\n1.0 2.0 3.0\n";
        let curve = ProfileFile::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(curve.x, vec![1.0]);
        assert_eq!(curve.y, vec![3.0]);
    }

    #[test]
    fn read_from_reports_bad_numbers() {
        let text = "x y\n1.0 nope\n";
        let err = ProfileFile::read_from(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(err, ProfileError::Parse { line: 2, .. }));
    }
}
