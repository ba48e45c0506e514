//! Color filter array description for monochrome and 2x2 Bayer sensors.

use std::fmt;

use crate::image_pipeline::common::error::{ProcessError, Result};

/// Logical color channel of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red = 0,
    Green = 1,
    Blue = 2,
}

impl Channel {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Filter layout of a sensor.
///
/// Bayer cells are stored as four filter indices in row-major order. Red is
/// 0, blue is 2 and the two green sites are 1 and 3, so `index & 1` is set
/// exactly for green.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfaPattern {
    Monochrome,
    Bayer([u8; 4]),
}

impl CfaPattern {
    pub const RGGB: CfaPattern = CfaPattern::Bayer([0, 1, 3, 2]);
    pub const BGGR: CfaPattern = CfaPattern::Bayer([2, 1, 3, 0]);
    pub const GRBG: CfaPattern = CfaPattern::Bayer([1, 0, 2, 3]);
    pub const GBRG: CfaPattern = CfaPattern::Bayer([1, 2, 0, 3]);

    /// Builds a Bayer pattern from the channels of a 2x2 cell, row-major.
    ///
    /// The first green encountered becomes filter 1, the second filter 3.
    pub fn from_cell(cell: [Channel; 4]) -> Result<Self> {
        let mut filters = [0u8; 4];
        let mut greens = 0;
        let mut reds = 0;
        let mut blues = 0;
        for (slot, channel) in filters.iter_mut().zip(cell) {
            *slot = match channel {
                Channel::Red => {
                    reds += 1;
                    0
                }
                Channel::Blue => {
                    blues += 1;
                    2
                }
                Channel::Green => {
                    greens += 1;
                    if greens == 1 { 1 } else { 3 }
                }
            };
        }
        if reds != 1 || blues != 1 || greens != 2 {
            return Err(ProcessError::UnsupportedCfa(format!("{:?}", cell)));
        }
        Ok(CfaPattern::Bayer(filters))
    }

    /// Parses a pattern name such as `RGGB`. An empty name is monochrome.
    pub fn from_name(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Ok(CfaPattern::Monochrome);
        }
        let channels = name
            .chars()
            .map(|c| match c.to_ascii_uppercase() {
                'R' => Ok(Channel::Red),
                'G' => Ok(Channel::Green),
                'B' => Ok(Channel::Blue),
                _ => Err(ProcessError::UnsupportedCfa(name.to_string())),
            })
            .collect::<Result<Vec<_>>>()?;
        let cell: [Channel; 4] = channels
            .try_into()
            .map_err(|_| ProcessError::UnsupportedCfa(name.to_string()))?;
        Self::from_cell(cell)
    }

    /// Filter index (0..=3) of the sample at `row`, `col`.
    #[inline]
    pub fn color_at(&self, row: usize, col: usize) -> usize {
        match self {
            CfaPattern::Monochrome => 0,
            CfaPattern::Bayer(filters) => filters[((row & 1) << 1) | (col & 1)] as usize,
        }
    }

    /// Logical channel of the sample at `row`, `col`; both green sites map to green.
    #[inline]
    pub fn channel_at(&self, row: usize, col: usize) -> Channel {
        match self.color_at(row, col) {
            0 => Channel::Red,
            2 => Channel::Blue,
            _ => Channel::Green,
        }
    }

    pub fn is_bayer(&self) -> bool {
        matches!(self, CfaPattern::Bayer(_))
    }

    /// Equivalent pattern for the `bayer` demosaic crate.
    pub(crate) fn to_demosaic_cfa(self) -> Option<bayer::CFA> {
        let channels = [
            self.channel_at(0, 0),
            self.channel_at(0, 1),
            self.channel_at(1, 0),
            self.channel_at(1, 1),
        ];
        match (self, channels) {
            (CfaPattern::Monochrome, _) => None,
            (_, [Channel::Red, _, _, Channel::Blue]) => Some(bayer::CFA::RGGB),
            (_, [Channel::Blue, _, _, Channel::Red]) => Some(bayer::CFA::BGGR),
            (_, [_, Channel::Red, Channel::Blue, _]) => Some(bayer::CFA::GRBG),
            (_, [_, Channel::Blue, Channel::Red, _]) => Some(bayer::CFA::GBRG),
            _ => None,
        }
    }
}

impl fmt::Display for CfaPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CfaPattern::Monochrome => f.write_str("monochrome"),
            CfaPattern::Bayer(_) => {
                for (row, col) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                    let c = match self.channel_at(row, col) {
                        Channel::Red => 'R',
                        Channel::Green => 'G',
                        Channel::Blue => 'B',
                    };
                    write!(f, "{c}")?;
                }
                Ok(())
            }
        }
    }
}
