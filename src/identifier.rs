use std::{fmt, str::FromStr};

const SERIES_NUMERALS: [&str; 9] = ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Series {
    I,
    II,
    III,
    IV,
    V,
    VI,
    VII,
    VIII,
    IX,
}

impl Series {
    pub const ALL: [Series; 9] = [
        Series::I,
        Series::II,
        Series::III,
        Series::IV,
        Series::V,
        Series::VI,
        Series::VII,
        Series::VIII,
        Series::IX,
    ];

    pub fn digit(self) -> u8 {
        self as u8
    }

    pub fn numeral(self) -> &'static str {
        SERIES_NUMERALS[self.digit() as usize]
    }

    pub fn from_digit(digit: u8) -> Option<Self> {
        Self::ALL.get(digit as usize).copied()
    }

    /// e.g. `Series II (SCP-1000 to SCP-1999)`.
    pub fn label(self) -> String {
        let digit = u32::from(self.digit());
        let (first, last) = if digit == 0 {
            ("SCP-001".to_string(), "SCP-999".to_string())
        } else {
            (
                format!("SCP-{}", digit * 1000),
                format!("SCP-{}", digit * 1000 + 999),
            )
        };
        format!("Series {} ({first} to {last})", self.numeral())
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.numeral())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSeries(pub String);

impl fmt::Display for UnknownSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown series '{}'", self.0)
    }
}

impl std::error::Error for UnknownSeries {}

impl FromStr for Series {
    type Err = UnknownSeries;

    /// Accepts the roman numeral (any case) or the series digit.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if let Ok(digit) = trimmed.parse::<u8>() {
            return Self::from_digit(digit).ok_or_else(|| UnknownSeries(trimmed.to_string()));
        }

        let upper = trimmed.to_ascii_uppercase();
        SERIES_NUMERALS
            .iter()
            .position(|numeral| *numeral == upper)
            .and_then(|index| Self::from_digit(index as u8))
            .ok_or_else(|| UnknownSeries(trimmed.to_string()))
    }
}

/// The 3-digit body the user typed did not name an entry in 001..=999.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidNumber(pub String);

impl fmt::Display for InvalidNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a 3-digit number in 001-999", self.0)
    }
}

impl std::error::Error for InvalidNumber {}

/// Four-character record key: series digit followed by a zero-padded number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    series: Series,
    number: u16,
}

impl Identifier {
    pub fn new(series: Series, number_text: &str) -> Result<Self, InvalidNumber> {
        let invalid = || InvalidNumber(number_text.to_string());
        if number_text.len() != 3 || !number_text.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(invalid());
        }

        let number: u16 = number_text.parse().map_err(|_| invalid())?;
        if !(1..=999).contains(&number) {
            return Err(invalid());
        }

        Ok(Self { series, number })
    }

    pub fn series(&self) -> Series {
        self.series
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn key(&self) -> String {
        format!("{}{:03}", self.series.digit(), self.number)
    }

    /// `SCP-` followed by the raw 4-character key.
    pub fn canonical_label(&self) -> String {
        format!("SCP-{}", self.key())
    }

    /// Conventional designation: a key below 1000 loses its leading zero,
    /// so `0096` renders as `SCP-096`.
    pub fn display_label(&self) -> String {
        let key = self.key();
        let value: u32 = u32::from(self.series.digit()) * 1000 + u32::from(self.number);
        match key.strip_prefix('0') {
            Some(body) if value < 1000 => format!("SCP-{body}"),
            _ => format!("SCP-{key}"),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
