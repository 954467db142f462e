//! SVG path data parsing.
//!
//! SVG path syntax: https://www.w3.org/TR/SVG/paths.html
//!
//! Every command is parsed so that a path can be walked end to end, but the
//! crop only ever looks at absolute move/line endpoints (see [`Path::corners`]).

use crate::error::CropError;

/// A parsed SVG path.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub commands: Vec<Command>,
}

/// A path command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// M/m - Move to
    MoveTo { rel: bool, x: f64, y: f64 },
    /// L/l - Line to
    LineTo { rel: bool, x: f64, y: f64 },
    /// H/h - Horizontal line to
    HorizontalTo { rel: bool, x: f64 },
    /// V/v - Vertical line to
    VerticalTo { rel: bool, y: f64 },
    /// C/c - Cubic bezier
    CurveTo { rel: bool, args: [f64; 6] },
    /// S/s - Smooth cubic bezier
    SmoothCurveTo { rel: bool, args: [f64; 4] },
    /// Q/q - Quadratic bezier
    QuadTo { rel: bool, args: [f64; 4] },
    /// T/t - Smooth quadratic bezier
    SmoothQuadTo { rel: bool, x: f64, y: f64 },
    /// A/a - Arc
    Arc {
        rel: bool,
        rx: f64,
        ry: f64,
        x_axis_rotation: f64,
        large_arc: bool,
        sweep: bool,
        x: f64,
        y: f64,
    },
    /// Z/z - Close path
    ClosePath,
}

impl Path {
    /// Endpoints of absolute `M` and `L` commands, in order.
    ///
    /// Clip rectangles in page exports are drawn with absolute moves and
    /// lines only; relative and curved segments are not part of the extent.
    pub fn corners(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.commands.iter().filter_map(|cmd| match *cmd {
            Command::MoveTo { rel: false, x, y } | Command::LineTo { rel: false, x, y } => {
                Some((x, y))
            }
            _ => None,
        })
    }
}

/// Parse SVG path data.
pub fn parse_path(d: &str) -> Result<Path, CropError> {
    PathParser::new(d).parse()
}

struct PathParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> PathParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse(&mut self) -> Result<Path, CropError> {
        let mut commands = Vec::new();
        let mut last_cmd: Option<char> = None;

        self.skip_whitespace();

        while let Some(c) = self.peek() {
            let cmd = if c.is_ascii_alphabetic() {
                self.next();
                last_cmd = Some(c);
                c
            } else {
                // Implicit repeat; after M the repeat is L, after m it is l
                match last_cmd {
                    Some('M') => 'L',
                    Some('m') => 'l',
                    // Z takes no operands, so it never repeats
                    Some(prev) if !prev.eq_ignore_ascii_case(&'z') => prev,
                    _ => {
                        return Err(CropError::InvalidPath(format!(
                            "Expected command letter at offset {} in {:?}",
                            self.pos, self.input
                        )));
                    }
                }
            };

            commands.push(self.parse_command(cmd)?);
            self.skip_whitespace_and_comma();
        }

        Ok(Path { commands })
    }

    fn parse_command(&mut self, cmd: char) -> Result<Command, CropError> {
        let rel = cmd.is_ascii_lowercase();

        let command = match cmd.to_ascii_lowercase() {
            'm' => {
                let [x, y] = self.numbers()?;
                Command::MoveTo { rel, x, y }
            }
            'l' => {
                let [x, y] = self.numbers()?;
                Command::LineTo { rel, x, y }
            }
            'h' => {
                let [x] = self.numbers()?;
                Command::HorizontalTo { rel, x }
            }
            'v' => {
                let [y] = self.numbers()?;
                Command::VerticalTo { rel, y }
            }
            'c' => Command::CurveTo {
                rel,
                args: self.numbers()?,
            },
            's' => Command::SmoothCurveTo {
                rel,
                args: self.numbers()?,
            },
            'q' => Command::QuadTo {
                rel,
                args: self.numbers()?,
            },
            't' => {
                let [x, y] = self.numbers()?;
                Command::SmoothQuadTo { rel, x, y }
            }
            'a' => {
                let [rx, ry, x_axis_rotation] = self.numbers()?;
                let large_arc = self.parse_flag()?;
                let sweep = self.parse_flag()?;
                let [x, y] = self.numbers()?;
                Command::Arc {
                    rel,
                    rx,
                    ry,
                    x_axis_rotation,
                    large_arc,
                    sweep,
                    x,
                    y,
                }
            }
            'z' => Command::ClosePath,
            _ => {
                return Err(CropError::InvalidPath(format!(
                    "Unknown command {:?} in {:?}",
                    cmd, self.input
                )));
            }
        };

        Ok(command)
    }

    fn numbers<const N: usize>(&mut self) -> Result<[f64; N], CropError> {
        let mut out = [0.0; N];
        for slot in &mut out {
            *slot = self.parse_number()?;
        }
        Ok(out)
    }

    fn parse_number(&mut self) -> Result<f64, CropError> {
        self.skip_whitespace_and_comma();

        let start = self.pos;

        if matches!(self.peek(), Some('-' | '+')) {
            self.next();
        }
        self.skip_digits();
        if self.peek() == Some('.') {
            self.next();
            self.skip_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.next();
            if matches!(self.peek(), Some('-' | '+')) {
                self.next();
            }
            self.skip_digits();
        }

        let s = &self.input[start..self.pos];
        if s.is_empty() {
            let token = self.input[start..]
                .split_ascii_whitespace()
                .next()
                .unwrap_or("");
            return Err(CropError::InvalidPath(format!(
                "Expected number, found {:?} in {:?}",
                token, self.input
            )));
        }

        s.parse()
            .map_err(|_| CropError::InvalidPath(format!("Invalid number {:?} in {:?}", s, self.input)))
    }

    fn parse_flag(&mut self) -> Result<bool, CropError> {
        self.skip_whitespace_and_comma();
        match self.next() {
            Some('0') => Ok(false),
            Some('1') => Ok(true),
            other => Err(CropError::InvalidPath(format!(
                "Expected arc flag (0 or 1), got {:?}",
                other
            ))),
        }
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.next();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.next();
        }
    }

    fn skip_whitespace_and_comma(&mut self) {
        self.skip_whitespace();
        if self.peek() == Some(',') {
            self.next();
        }
        self.skip_whitespace();
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }
}
