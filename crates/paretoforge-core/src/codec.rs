//! Fixed-width record codec.
//!
//! Records are decoded by slicing the byte spans of their layout and encoded
//! by splicing freshly formatted values back into the original text, so every
//! byte outside a field span survives untouched and the record length never
//! changes.

use crate::core_types::Genome;
use crate::error::{CodecError, VariationError};
use paretoforge_protocol::schema::{record_label, LayoutRule, RecordLayout, Schema};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GenomeCodec {
    schema: Arc<Schema>,
}

impl GenomeCodec {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Byte spans of every field of `layout` inside `record`.
    fn spans(record: &str, layout: &RecordLayout) -> Result<Vec<Range<usize>>, CodecError> {
        let outside = |name: &str| CodecError::OutOfRecord {
            field: name.to_string(),
            len: record.len(),
        };

        match &layout.rule {
            LayoutRule::Columns { fields } => fields
                .iter()
                .map(|f| {
                    let span = f.start..f.start + f.width;
                    record.get(span.clone()).ok_or_else(|| outside(&f.name))?;
                    Ok(span)
                })
                .collect(),
            LayoutRule::Separated { separator, field } => {
                let tail = record.get(field.start..).ok_or_else(|| outside(&field.name))?;
                let end = match tail.find(*separator) {
                    Some(pos) => field.start + pos,
                    None => field.start + field.width,
                };
                if end == field.start || record.get(field.start..end).is_none() {
                    return Err(outside(&field.name));
                }
                Ok(vec![field.start..end])
            }
        }
    }

    /// Parses every field of `record` under `layout`. Never modifies `record`.
    pub fn decode(record: &str, layout: &RecordLayout) -> Result<Vec<f64>, CodecError> {
        let spans = Self::spans(record, layout)?;
        layout
            .rule
            .fields()
            .iter()
            .zip(spans)
            .map(|(f, span)| {
                let text = &record[span];
                match text.trim().parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(v),
                    _ => Err(CodecError::NotNumeric {
                        field: f.name.clone(),
                        text: text.to_string(),
                    }),
                }
            })
            .collect()
    }

    /// Clips `values` to their bounds, formats each into its span and splices
    /// the result into `original`. The output has the length of `original`.
    pub fn encode(
        values: &[f64],
        layout: &RecordLayout,
        original: &str,
    ) -> Result<String, CodecError> {
        let fields = layout.rule.fields();
        if values.len() != fields.len() {
            return Err(CodecError::FieldCount {
                keyword: layout.keyword.clone(),
                count: fields.len(),
                got: values.len(),
            });
        }

        let spans = Self::spans(original, layout)?;
        let mut patches: Vec<(Range<usize>, String)> = Vec::with_capacity(spans.len());
        for ((f, &raw), span) in fields.iter().zip(values).zip(spans) {
            let value = f.clip(raw);
            let text = f
                .format_to_width(value, span.len())
                .ok_or_else(|| CodecError::Overflow {
                    field: f.name.clone(),
                    value,
                    width: span.len(),
                })?;
            if value != raw {
                debug!("{}.{} clipped {} -> {}", layout.keyword, f.name, raw, value);
            }
            patches.push((span, text));
        }
        patches.sort_by_key(|(span, _)| span.start);

        let mut out = String::with_capacity(original.len());
        let mut cursor = 0;
        for (span, text) in patches {
            out.push_str(&original[cursor..span.start]);
            out.push_str(&text);
            cursor = span.end;
        }
        out.push_str(&original[cursor..]);
        Ok(out)
    }

    pub fn layout_for(&self, record: &str) -> Option<&RecordLayout> {
        self.schema.layout_for(record)
    }

    /// Decodes by keyword dispatch. `None` for records with no layout.
    pub fn decode_record(&self, record: &str) -> Result<Option<Vec<f64>>, CodecError> {
        match self.layout_for(record) {
            Some(layout) => Self::decode(record, layout).map(Some),
            None => Ok(None),
        }
    }

    /// Encodes by keyword dispatch. Records with no layout come back unchanged.
    pub fn encode_record(&self, values: &[f64], original: &str) -> Result<String, CodecError> {
        match self.layout_for(original) {
            Some(layout) => Self::encode(values, layout, original),
            None => Ok(original.to_string()),
        }
    }

    /// Field names paired with their decoded values.
    pub fn decode_named(&self, record: &str) -> Result<Vec<(String, f64)>, CodecError> {
        let Some(layout) = self.layout_for(record) else {
            return Ok(Vec::new());
        };
        let values = Self::decode(record, layout)?;
        Ok(layout
            .rule
            .fields()
            .iter()
            .map(|f| f.name.clone())
            .zip(values)
            .collect())
    }

    pub fn field_count(&self, record: &str) -> usize {
        self.layout_for(record)
            .map(|l| l.rule.field_count())
            .unwrap_or(0)
    }

    /// Multiplies one field by `factor`, clips and re-encodes.
    pub fn perturb(&self, record: &str, field_index: usize, factor: f64) -> Result<String, CodecError> {
        let Some(layout) = self.layout_for(record) else {
            return Ok(record.to_string());
        };
        let mut values = Self::decode(record, layout)?;
        let count = values.len();
        let slot = values.get_mut(field_index).ok_or_else(|| CodecError::FieldCount {
            keyword: layout.keyword.clone(),
            count,
            got: field_index + 1,
        })?;
        *slot *= factor;
        Self::encode(&values, layout, record)
    }

    /// Checks that `genome` has exactly the schema's blocks, that each record
    /// starts with its block label, and that every field decodes inside its
    /// bounds.
    pub fn validate_genome(&self, genome: &Genome) -> Result<(), VariationError> {
        let reject = |reason: String| Err(VariationError::malformed(reason, genome.to_payload()));

        if genome.is_empty() {
            return reject("genome has no blocks".into());
        }
        if let Some(missing) = self.schema.blocks.iter().find(|b| genome.get(b).is_none()) {
            return reject(format!("missing block '{}'", missing));
        }
        if let Some(extra) = genome.names().find(|n| !self.schema.has_block(n)) {
            return reject(format!("unknown block '{}'", extra));
        }

        for (name, record) in genome.blocks() {
            let named = record
                .strip_prefix(record_label(name).as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace));
            if !named {
                return reject(format!("record of '{}' does not start with its name", name));
            }

            let Some(layout) = self.layout_for(record) else {
                continue;
            };
            let values = match Self::decode(record, layout) {
                Ok(v) => v,
                Err(e) => return reject(format!("'{}': {}", name, e)),
            };
            for (f, v) in layout.rule.fields().iter().zip(&values) {
                if !f.contains(*v) {
                    return reject(format!(
                        "'{}': {} = {} outside [{}, {}]",
                        name, f.name, v, f.min, f.max
                    ));
                }
            }
        }
        Ok(())
    }
}
