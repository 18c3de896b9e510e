use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Justify {
    Left,
    Right,
}

/// A fixed-point numeric field inside a record.
///
/// `start` is a byte offset. For the column family the span is exactly
/// `start..start + width`; for the separator family `width` is only used when
/// the separator is missing from the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub start: usize,
    pub width: usize,
    pub precision: usize,
    pub justify: Justify,
    pub min: f64,
    pub max: f64,
}

impl FieldSpec {
    /// NaN clips to `min`; infinities clip to the nearer bound.
    #[inline(always)]
    pub fn clip(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    #[inline(always)]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Formats `value` into exactly `width` bytes.
    ///
    /// Precision is lowered one digit at a time until the text fits; `None`
    /// means not even the integer part fits.
    pub fn format_to_width(&self, value: f64, width: usize) -> Option<String> {
        (0..=self.precision).rev().find_map(|p| {
            let text = format!("{:.*}", p, value);
            if text.len() > width {
                return None;
            }
            Some(match self.justify {
                Justify::Left => format!("{:<width$}", text, width = width),
                Justify::Right => format!("{:>width$}", text, width = width),
            })
        })
    }

    /// True when both bounds format at full precision within the field width.
    pub fn bounds_fit(&self) -> bool {
        [self.min, self.max]
            .iter()
            .all(|v| format!("{:.*}", self.precision, v).len() <= self.width)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum LayoutRule {
    /// Column-tabulated fields at fixed byte spans.
    Columns { fields: Vec<FieldSpec> },
    /// One value that runs from its start column up to a separator character.
    Separated { separator: char, field: FieldSpec },
}

impl LayoutRule {
    pub fn fields(&self) -> Vec<&FieldSpec> {
        match self {
            LayoutRule::Columns { fields } => fields.iter().collect(),
            LayoutRule::Separated { field, .. } => vec![field],
        }
    }

    pub fn field_count(&self) -> usize {
        match self {
            LayoutRule::Columns { fields } => fields.len(),
            LayoutRule::Separated { .. } => 1,
        }
    }
}

/// Layout rule for every record that starts with `keyword`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordLayout {
    pub keyword: String,
    #[serde(flatten)]
    pub rule: LayoutRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub layouts: Vec<RecordLayout>,
    pub blocks: Vec<String>,
}

/// First whitespace-separated token of a record.
#[inline]
pub fn keyword_of(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

/// Text a block's record starts with. Block names spell the separating
/// space as `_` (`GRUP_LG1` labels `GRUP LG1 ...`).
#[inline]
pub fn record_label(block: &str) -> String {
    block.replace('_', " ")
}

impl Schema {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let schema: Schema = serde_json::from_str(&content)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn layout(&self, keyword: &str) -> Option<&RecordLayout> {
        self.layouts.iter().find(|l| l.keyword == keyword)
    }

    /// Dispatches on the literal keyword prefix of a record.
    pub fn layout_for(&self, record: &str) -> Option<&RecordLayout> {
        self.layout(keyword_of(record))
    }

    pub fn has_block(&self, name: &str) -> bool {
        self.blocks.iter().any(|b| b == name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let err = |msg: String| Err(ConfigError::Schema(msg));

        if self.blocks.is_empty() {
            return err("schema declares no blocks".into());
        }

        let mut seen = HashSet::new();
        for name in &self.blocks {
            if name.trim().is_empty() || name.contains(char::is_whitespace) {
                return err(format!("invalid block name '{}'", name));
            }
            if !seen.insert(name.as_str()) {
                return err(format!("duplicate block '{}'", name));
            }
        }

        let mut keywords = HashSet::new();
        for layout in &self.layouts {
            if layout.keyword.is_empty() || layout.keyword.contains(char::is_whitespace) {
                return err(format!("invalid layout keyword '{}'", layout.keyword));
            }
            if !keywords.insert(layout.keyword.as_str()) {
                return err(format!("duplicate layout '{}'", layout.keyword));
            }

            if let LayoutRule::Separated { separator, .. } = &layout.rule {
                if separator.is_ascii_digit() || matches!(separator, '.' | '-' | '+' | ' ') {
                    return err(format!(
                        "layout '{}': separator '{}' is ambiguous with numeric text",
                        layout.keyword, separator
                    ));
                }
            }

            let fields = layout.rule.fields();
            if fields.is_empty() {
                return err(format!("layout '{}' has no fields", layout.keyword));
            }

            for f in &fields {
                if f.width == 0 {
                    return err(format!("{}.{}: zero width", layout.keyword, f.name));
                }
                if !f.min.is_finite() || !f.max.is_finite() || f.min > f.max {
                    return err(format!("{}.{}: invalid bounds", layout.keyword, f.name));
                }
                if !f.bounds_fit() {
                    return err(format!(
                        "{}.{}: bounds do not fit width {} at precision {}",
                        layout.keyword, f.name, f.width, f.precision
                    ));
                }
                if f.start < layout.keyword.len() {
                    return err(format!(
                        "{}.{}: field overlaps the keyword",
                        layout.keyword, f.name
                    ));
                }
            }

            if let LayoutRule::Columns { fields } = &layout.rule {
                let mut spans: Vec<(usize, usize)> =
                    fields.iter().map(|f| (f.start, f.start + f.width)).collect();
                spans.sort();
                if spans.windows(2).any(|w| w[0].1 > w[1].0) {
                    return err(format!("layout '{}' has overlapping fields", layout.keyword));
                }
            }
        }

        Ok(())
    }
}

impl Default for Schema {
    /// Tubular member groups (`GRUP`) and the plate group (`PGRUP`) of the
    /// reference jacket model.
    fn default() -> Self {
        let grup = RecordLayout {
            keyword: "GRUP".into(),
            rule: LayoutRule::Columns {
                fields: vec![
                    FieldSpec {
                        name: "od".into(),
                        start: 17,
                        width: 6,
                        precision: 3,
                        justify: Justify::Right,
                        min: 10.0,
                        max: 48.0,
                    },
                    FieldSpec {
                        name: "wt".into(),
                        start: 24,
                        width: 5,
                        precision: 3,
                        justify: Justify::Right,
                        min: 0.5,
                        max: 2.5,
                    },
                ],
            },
        };

        let pgrup = RecordLayout {
            keyword: "PGRUP".into(),
            rule: LayoutRule::Separated {
                separator: 'I',
                field: FieldSpec {
                    name: "thickness".into(),
                    start: 10,
                    width: 6,
                    precision: 4,
                    justify: Justify::Left,
                    min: 0.25,
                    max: 0.75,
                },
            },
        };

        let mut blocks: Vec<String> = Vec::new();
        for g in ["LG1", "LG2", "LG3", "LG4", "LG5", "LG6", "LG7"] {
            blocks.push(format!("GRUP_{}", g));
        }
        for g in ["PL1", "PL2", "PL3", "PL4"] {
            blocks.push(format!("GRUP_{}", g));
        }
        for g in ["T01", "T02", "T03", "T04", "T05", "W.B"] {
            blocks.push(format!("GRUP_{}", g));
        }
        blocks.push("PGRUP_P01".into());

        Self {
            layouts: vec![grup, pgrup],
            blocks,
        }
    }
}
