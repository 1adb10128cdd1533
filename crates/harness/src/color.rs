//! RGB colors sampled from rendered video and the similarity test applied to them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// 8-bit RGB color.
///
/// Serializes as `"#rrggbb"`; parses either that form or `"rgb(r, g, b)"`,
/// which is what `getComputedStyle` and canvas probes in the browser report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Rgb {
	pub const fn new(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b }
	}

	/// Euclidean distance in RGB space, in `0.0..=441.7`.
	pub fn distance(&self, other: &Rgb) -> f64 {
		let dr = f64::from(self.r) - f64::from(other.r);
		let dg = f64::from(self.g) - f64::from(other.g);
		let db = f64::from(self.b) - f64::from(other.b);
		(dr * dr + dg * dg + db * db).sqrt()
	}

	/// Returns true if `other` lies strictly within `threshold` of this color.
	pub fn is_similar_to(&self, other: &Rgb, threshold: f64) -> bool {
		self.distance(other) < threshold
	}
}

impl fmt::Display for Rgb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
	}
}

impl FromStr for Rgb {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if let Some(hex) = s.strip_prefix('#') {
			return parse_hex(hex).ok_or_else(|| Error::Config(format!("invalid hex color '{s}'")));
		}
		if let Some(body) = s.strip_prefix("rgb(").and_then(|rest| rest.strip_suffix(')')) {
			return parse_components(body).ok_or_else(|| Error::Config(format!("invalid rgb() color '{s}'")));
		}
		Err(Error::Config(format!("unrecognized color '{s}'")))
	}
}

fn parse_hex(hex: &str) -> Option<Rgb> {
	if hex.len() != 6 || !hex.is_ascii() {
		return None;
	}
	let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
	Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

fn parse_components(body: &str) -> Option<Rgb> {
	let mut parts = body.split(',').map(|p| p.trim().parse::<u8>());
	let r = parts.next()?.ok()?;
	let g = parts.next()?.ok()?;
	let b = parts.next()?.ok()?;
	if parts.next().is_some() {
		return None;
	}
	Some(Rgb::new(r, g, b))
}

impl Serialize for Rgb {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Rgb {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		raw.parse().map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const GREEN: Rgb = Rgb::new(0, 135, 0);

	#[test]
	fn parses_hex_and_rgb_forms() {
		assert_eq!("#008700".parse::<Rgb>().unwrap(), GREEN);
		assert_eq!("rgb(0, 135, 0)".parse::<Rgb>().unwrap(), GREEN);
		assert_eq!("rgb(0,135,0)".parse::<Rgb>().unwrap(), GREEN);
	}

	#[test]
	fn rejects_malformed_colors() {
		assert!("#0087".parse::<Rgb>().is_err());
		assert!("rgb(0, 300, 0)".parse::<Rgb>().is_err());
		assert!("rgb(1, 2, 3, 4)".parse::<Rgb>().is_err());
		assert!("green".parse::<Rgb>().is_err());
	}

	#[test]
	fn display_is_lowercase_hex() {
		assert_eq!(GREEN.to_string(), "#008700");
	}

	#[test]
	fn similarity_tolerates_encoding_noise() {
		let decoded = Rgb::new(12, 128, 9);
		assert!(GREEN.is_similar_to(&decoded, 60.0));
		assert!(!GREEN.is_similar_to(&Rgb::new(135, 0, 0), 60.0));
	}

	#[test]
	fn distance_is_symmetric_and_zero_on_identity() {
		let other = Rgb::new(30, 100, 40);
		assert_eq!(GREEN.distance(&GREEN), 0.0);
		assert_eq!(GREEN.distance(&other), other.distance(&GREEN));
	}

	#[test]
	fn serde_uses_hex_string() {
		let json = serde_json::to_string(&GREEN).unwrap();
		assert_eq!(json, "\"#008700\"");
		let back: Rgb = serde_json::from_str("\"rgb(0, 135, 0)\"").unwrap();
		assert_eq!(back, GREEN);
	}
}
