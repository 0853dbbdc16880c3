//! Band-expression styles.
//!
//! Expressions use the OpenLayers WebGL array form:
//!
//! ```text
//! ["/", ["-", ["band", 2], ["band", 1]], ["+", ["band", 2], ["band", 1]]]
//! ```
//!
//! Bands are numbered from 1 and read normalized to [0, 1] (see
//! [`Normalization`]). With `n` input bands, band `n + 1` is the alpha band:
//! 1 where every input is valid, 0 otherwise. A style's `color` is
//! `["color", red, green, blue, alpha]` with channels in 0..=255 and alpha
//! in [0, 1].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StyleError};
use nbrwatch_core::raster::Raster;

/// Per-pixel arithmetic over input bands
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    /// 1-based band index
    Band(usize),
    Add(Vec<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Vec<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Abs(Box<Expr>),
    Clamp(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn parse(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(Expr::Const)
                .ok_or_else(|| StyleError::InvalidExpression(n.to_string())),
            Value::Array(items) => {
                let (op, args) = match items.split_first() {
                    Some((Value::String(op), args)) => (op.as_str(), args),
                    _ => return Err(StyleError::InvalidExpression(value.to_string())),
                };
                Self::parse_call(op, args)
            }
            other => Err(StyleError::InvalidExpression(other.to_string())),
        }
    }

    fn parse_call(op: &str, args: &[Value]) -> Result<Self> {
        let arity = |expected: &'static str, ok: bool| {
            if ok {
                Ok(())
            } else {
                Err(StyleError::Arity {
                    op: op.to_string(),
                    expected,
                    found: args.len(),
                })
            }
        };
        let parsed = || args.iter().map(Expr::parse).collect::<Result<Vec<_>>>();
        let boxed = |i: usize| Expr::parse(&args[i]).map(Box::new);

        match op {
            "band" => {
                arity("1", args.len() == 1)?;
                match args[0].as_u64() {
                    Some(b) if b >= 1 => Ok(Expr::Band(b as usize)),
                    _ => Err(StyleError::InvalidExpression(format!(
                        "band index must be a positive integer, got {}",
                        args[0]
                    ))),
                }
            }
            "+" => {
                arity("at least 2", args.len() >= 2)?;
                Ok(Expr::Add(parsed()?))
            }
            "*" => {
                arity("at least 2", args.len() >= 2)?;
                Ok(Expr::Mul(parsed()?))
            }
            "-" => {
                arity("2", args.len() == 2)?;
                Ok(Expr::Sub(boxed(0)?, boxed(1)?))
            }
            "/" => {
                arity("2", args.len() == 2)?;
                Ok(Expr::Div(boxed(0)?, boxed(1)?))
            }
            "abs" => {
                arity("1", args.len() == 1)?;
                Ok(Expr::Abs(boxed(0)?))
            }
            "clamp" => {
                arity("3", args.len() == 3)?;
                Ok(Expr::Clamp(boxed(0)?, boxed(1)?, boxed(2)?))
            }
            other => Err(StyleError::UnknownOperator(other.to_string())),
        }
    }

    /// Evaluate over one pixel. `bands[i]` is band `i + 1`; a zero
    /// denominator yields NaN.
    pub fn eval(&self, bands: &[f64]) -> f64 {
        match self {
            Expr::Const(v) => *v,
            Expr::Band(b) => b
                .checked_sub(1)
                .and_then(|i| bands.get(i))
                .copied()
                .unwrap_or(f64::NAN),
            Expr::Add(terms) => terms.iter().map(|e| e.eval(bands)).sum(),
            Expr::Mul(terms) => terms.iter().map(|e| e.eval(bands)).product(),
            Expr::Sub(a, b) => a.eval(bands) - b.eval(bands),
            Expr::Div(a, b) => {
                let d = b.eval(bands);
                if d == 0.0 {
                    f64::NAN
                } else {
                    a.eval(bands) / d
                }
            }
            Expr::Abs(a) => a.eval(bands).abs(),
            Expr::Clamp(v, lo, hi) => {
                let (lo, hi) = (lo.eval(bands), hi.eval(bands));
                v.eval(bands).max(lo).min(hi)
            }
        }
    }

    /// Highest band index referenced
    pub fn max_band(&self) -> usize {
        match self {
            Expr::Const(_) => 0,
            Expr::Band(b) => *b,
            Expr::Add(terms) | Expr::Mul(terms) => {
                terms.iter().map(Expr::max_band).max().unwrap_or(0)
            }
            Expr::Sub(a, b) | Expr::Div(a, b) => a.max_band().max(b.max_band()),
            Expr::Abs(a) => a.max_band(),
            Expr::Clamp(v, lo, hi) => v.max_band().max(lo.max_band()).max(hi.max_band()),
        }
    }
}

/// Linear scaling of raw band values into [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub min: f64,
    pub max: f64,
    /// Raw value marking missing data
    #[serde(default)]
    pub nodata: Option<f64>,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            nodata: None,
        }
    }
}

impl Normalization {
    /// Sentinel-1 backscatter in dB as served by the windthrow GeoTIFFs
    pub fn backscatter() -> Self {
        Self {
            min: -30.0,
            max: 30.0,
            nodata: Some(0.0),
        }
    }

    /// Normalized value, `None` for missing data
    pub fn apply(&self, raw: f64) -> Option<f64> {
        if raw.is_nan() || self.nodata == Some(raw) {
            return None;
        }
        let range = self.max - self.min;
        if range == 0.0 {
            return Some(0.0);
        }
        Some((raw - self.min) / range)
    }
}

/// RGBA color computed per pixel from band expressions
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub red: Expr,
    pub green: Expr,
    pub blue: Expr,
    pub alpha: Expr,
}

impl Style {
    /// Parse `["color", r, g, b, a]`, or an object `{"color": [...]}`.
    /// Alpha defaults to 1 when omitted.
    pub fn from_value(value: &Value) -> Result<Self> {
        let color = match value {
            Value::Object(map) => map
                .get("color")
                .ok_or_else(|| StyleError::InvalidExpression("style without 'color'".into()))?,
            other => other,
        };
        let items = match color.as_array().and_then(|a| a.split_first()) {
            Some((Value::String(op), args)) if op == "color" => args,
            _ => {
                return Err(StyleError::InvalidExpression(format!(
                    "expected [\"color\", r, g, b, a], got {}",
                    color
                )))
            }
        };
        if !(3..=4).contains(&items.len()) {
            return Err(StyleError::Arity {
                op: "color".into(),
                expected: "3 or 4",
                found: items.len(),
            });
        }
        Ok(Self {
            red: Expr::parse(&items[0])?,
            green: Expr::parse(&items[1])?,
            blue: Expr::parse(&items[2])?,
            alpha: match items.get(3) {
                Some(a) => Expr::parse(a)?,
                None => Expr::Const(1.0),
            },
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(&serde_json::from_str(text)?)
    }

    /// Highest band index any channel references
    pub fn max_band(&self) -> usize {
        [&self.red, &self.green, &self.blue, &self.alpha]
            .iter()
            .map(|e| e.max_band())
            .max()
            .unwrap_or(0)
    }

    /// RGBA of one pixel from normalized band values. A channel that is
    /// not finite makes the pixel transparent.
    pub fn pixel(&self, bands: &[f64]) -> [u8; 4] {
        let channels = [
            self.red.eval(bands),
            self.green.eval(bands),
            self.blue.eval(bands),
            self.alpha.eval(bands) * 255.0,
        ];
        if channels.iter().any(|c| !c.is_finite()) {
            return [0, 0, 0, 0];
        }
        channels.map(|c| c.clamp(0.0, 255.0).round() as u8)
    }

    /// Render co-registered input bands into an RGBA buffer
    pub fn render(&self, bands: &[&Raster<f64>], norm: &Normalization) -> Result<Vec<u8>> {
        let available = bands.len();
        if self.max_band() > available + 1 {
            return Err(StyleError::BandOutOfRange {
                band: self.max_band(),
                available,
            });
        }
        let shape = bands.first().map(|b| b.shape()).unwrap_or((0, 0));
        if let Some(bad) = bands.iter().find(|b| b.shape() != shape) {
            return Err(StyleError::ShapeMismatch {
                expected: shape,
                actual: bad.shape(),
            });
        }

        let mut rgba = vec![0u8; shape.0 * shape.1 * 4];
        let mut values = vec![0.0; available + 1];
        for (i, pixel) in rgba.chunks_exact_mut(4).enumerate() {
            let (row, col) = (i / shape.1, i % shape.1);
            let mut valid = true;
            for (slot, band) in values.iter_mut().zip(bands) {
                let raw = band.get(row, col).unwrap_or(f64::NAN);
                match norm.apply(raw) {
                    Some(v) => *slot = v,
                    None => {
                        *slot = f64::NAN;
                        valid = false;
                    }
                }
            }
            values[available] = if valid { 1.0 } else { 0.0 };
            pixel.copy_from_slice(&self.pixel(&values));
        }
        Ok(rgba)
    }
}

impl Serialize for Style {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let color = Value::Array(vec![
            Value::from("color"),
            expr_to_value(&self.red),
            expr_to_value(&self.green),
            expr_to_value(&self.blue),
            expr_to_value(&self.alpha),
        ]);
        color.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Style {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Style::from_value(&value).map_err(serde::de::Error::custom)
    }
}

fn expr_to_value(expr: &Expr) -> Value {
    let call = |op: &str, args: Vec<Value>| {
        let mut items = vec![Value::from(op)];
        items.extend(args);
        Value::Array(items)
    };
    match expr {
        Expr::Const(v) => Value::from(*v),
        Expr::Band(b) => call("band", vec![Value::from(*b)]),
        Expr::Add(t) => call("+", t.iter().map(expr_to_value).collect()),
        Expr::Mul(t) => call("*", t.iter().map(expr_to_value).collect()),
        Expr::Sub(a, b) => call("-", vec![expr_to_value(a), expr_to_value(b)]),
        Expr::Div(a, b) => call("/", vec![expr_to_value(a), expr_to_value(b)]),
        Expr::Abs(a) => call("abs", vec![expr_to_value(a)]),
        Expr::Clamp(v, lo, hi) => call(
            "clamp",
            vec![expr_to_value(v), expr_to_value(lo), expr_to_value(hi)],
        ),
    }
}

// ─── Presets ───────────────────────────────────────────────────────────

fn normalized_difference(a: usize, b: usize) -> Expr {
    Expr::Div(
        Box::new(Expr::Sub(Box::new(Expr::Band(a)), Box::new(Expr::Band(b)))),
        Box::new(Expr::Add(vec![Expr::Band(a), Expr::Band(b)])),
    )
}

fn scaled(e: Expr) -> Expr {
    Expr::Mul(vec![Expr::Const(255.0), e])
}

/// Red `|NDVI - NDWI|`, green NDVI, blue NDWI, alpha band 4.
///
/// NDVI is `(b2 - b1) / (b2 + b1)`, NDWI `(b3 - b1) / (b3 + b1)`.
fn ndvi_ndwi() -> Style {
    let ndvi = normalized_difference(2, 1);
    let ndwi = normalized_difference(3, 1);
    Style {
        red: scaled(Expr::Abs(Box::new(Expr::Sub(
            Box::new(ndvi.clone()),
            Box::new(ndwi.clone()),
        )))),
        green: scaled(ndvi),
        blue: scaled(ndwi),
        alpha: Expr::Band(4),
    }
}

fn grayscale() -> Style {
    Style {
        red: scaled(Expr::Band(1)),
        green: scaled(Expr::Band(1)),
        blue: scaled(Expr::Band(1)),
        alpha: Expr::Band(2),
    }
}

fn true_color() -> Style {
    Style {
        red: scaled(Expr::Band(1)),
        green: scaled(Expr::Band(2)),
        blue: scaled(Expr::Band(3)),
        alpha: Expr::Band(4),
    }
}

/// Named styles with one active selection
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    styles: BTreeMap<String, Style>,
    active: String,
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::with_presets()
    }
}

impl StyleRegistry {
    pub const DEFAULT_STYLE: &'static str = "ndvi-ndwi";

    /// `ndvi-ndwi` (active), `grayscale` and `true-color`
    pub fn with_presets() -> Self {
        let mut styles = BTreeMap::new();
        styles.insert(Self::DEFAULT_STYLE.to_string(), ndvi_ndwi());
        styles.insert("grayscale".to_string(), grayscale());
        styles.insert("true-color".to_string(), true_color());
        Self {
            styles,
            active: Self::DEFAULT_STYLE.to_string(),
        }
    }

    /// Add or replace a style
    pub fn register(&mut self, name: impl Into<String>, style: Style) {
        self.styles.insert(name.into(), style);
    }

    /// Add the styles of a JSON object `{"name": ["color", ...], ...}`;
    /// returns how many were read.
    pub fn extend_from_json(&mut self, text: &str) -> Result<usize> {
        let styles: BTreeMap<String, Style> = serde_json::from_str(text)?;
        let count = styles.len();
        self.styles.extend(styles);
        Ok(count)
    }

    /// Make `name` the active style. An undefined name returns `false`
    /// and keeps the current selection.
    pub fn select(&mut self, name: &str) -> bool {
        if self.styles.contains_key(name) {
            self.active = name.to_string();
            true
        } else {
            false
        }
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn active(&self) -> Option<&Style> {
        self.styles.get(&self.active)
    }

    pub fn get(&self, name: &str) -> Option<&Style> {
        self.styles.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }
}
