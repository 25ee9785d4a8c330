//! Stat line templates.
//!
//! A stat line is the right-hand column of a report line, e.g.
//! `"{delta:.1} ms ({pct}%)"`. Templates are parsed once when a metric is
//! registered and rendered at report time, when the span's samples and its
//! share of the parent are both known.
//!
//! Placeholders: `start`, `end`, `delta`, `pct`, `unit`, each optionally
//! followed by a precision (`{delta:.4}`). `{{` and `}}` are literal braces.

use crate::report::glyphs;
use crate::utils::error::TemplateError;
use std::fmt::Write;

/// Stat line used when a metric does not supply one
pub const DEFAULT_STAT_LINE: &str = "{start:.2} {unit} → {end:.2} {unit} ({delta:.4} ∆)";

/// Decimals used for `{pct}` when the template gives none
const DEFAULT_PCT_PRECISION: usize = 0;

/// A value a placeholder can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Start,
    End,
    Delta,
    Pct,
    Unit,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Field::Start),
            "end" => Some(Field::End),
            "delta" => Some(Field::Delta),
            "pct" => Some(Field::Pct),
            "unit" => Some(Field::Unit),
            _ => None,
        }
    }
}

/// Share of a span in its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percent {
    Of(f64),
    /// Parent delta was zero
    Undefined,
}

impl Percent {
    /// `100 * part / whole`, or `Undefined` when `whole` is zero
    pub fn of(part: f64, whole: f64) -> Self {
        if whole == 0.0 {
            Percent::Undefined
        } else {
            Percent::Of(part / whole * 100.0)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Percent::Of(pct) => Some(*pct),
            Percent::Undefined => None,
        }
    }
}

/// Everything a stat line can show for one span
#[derive(Debug, Clone, Copy)]
pub struct StatValues<'a> {
    pub start: f64,
    pub end: f64,
    pub delta: f64,
    pub unit: &'a str,
    pub pct: Percent,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder {
        field: Field,
        precision: Option<usize>,
    },
}

/// A parsed stat line template
#[derive(Debug, Clone, PartialEq)]
pub struct StatTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl StatTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' => {
                    if chars.next_if(|&(_, next)| next == '{').is_some() {
                        literal.push('{');
                        continue;
                    }

                    let mut body = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        body.push(inner);
                    }
                    if !closed {
                        return Err(TemplateError::Unclosed(pos));
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_placeholder(&body)?);
                }
                '}' => {
                    if chars.next_if(|&(_, next)| next == '}').is_none() {
                        return Err(TemplateError::UnmatchedClose(pos));
                    }
                    literal.push('}');
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn render(&self, values: &StatValues<'_>) -> String {
        let mut out = String::with_capacity(self.source.len() + 16);

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { field, precision } => match field {
                    Field::Start => push_number(&mut out, values.start, *precision),
                    Field::End => push_number(&mut out, values.end, *precision),
                    Field::Delta => push_number(&mut out, values.delta, *precision),
                    Field::Unit => out.push_str(values.unit),
                    Field::Pct => match values.pct {
                        Percent::Of(pct) => push_number(
                            &mut out,
                            pct,
                            Some(precision.unwrap_or(DEFAULT_PCT_PRECISION)),
                        ),
                        Percent::Undefined => out.push_str(glyphs::HORZ),
                    },
                },
            }
        }

        out
    }
}

fn parse_placeholder(body: &str) -> Result<Segment, TemplateError> {
    let (name, spec) = match body.split_once(':') {
        Some((name, spec)) => (name, Some(spec)),
        None => (body, None),
    };

    let field = Field::parse(name).ok_or_else(|| TemplateError::UnknownField(name.to_string()))?;

    let precision = match spec {
        None | Some("") => None,
        Some(spec) => {
            let digits = spec.strip_prefix('.').filter(|d| !d.is_empty());
            match digits.and_then(|d| d.parse::<usize>().ok()) {
                Some(precision) => Some(precision),
                None => {
                    return Err(TemplateError::InvalidSpec {
                        field: name.to_string(),
                        spec: spec.to_string(),
                    })
                }
            }
        }
    };

    Ok(Segment::Placeholder { field, precision })
}

fn push_number(out: &mut String, value: f64, precision: Option<usize>) {
    // Writing into a String cannot fail
    let _ = match precision {
        Some(precision) => write!(out, "{:.*}", precision, value),
        None => write!(out, "{}", value),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pct: Percent) -> StatValues<'static> {
        StatValues {
            start: 1.5,
            end: 4.0,
            delta: 2.5,
            unit: "ms",
            pct,
        }
    }

    #[test]
    fn test_default_template_parses() {
        let template = StatTemplate::parse(DEFAULT_STAT_LINE).unwrap();
        assert_eq!(template.as_str(), DEFAULT_STAT_LINE);
        assert_eq!(
            template.render(&values(Percent::Of(50.0))),
            "1.50 ms → 4.00 ms (2.5000 ∆)"
        );
    }

    #[test]
    fn test_render_child_line() {
        let template = StatTemplate::parse("{delta:.1} ms ({pct}%)").unwrap();
        assert_eq!(template.render(&values(Percent::Of(80.0))), "2.5 ms (80%)");
    }

    #[test]
    fn test_render_undefined_percent() {
        let template = StatTemplate::parse("{pct:.2}%").unwrap();
        assert_eq!(template.render(&values(Percent::Undefined)), "─%");
    }

    #[test]
    fn test_no_precision_uses_display() {
        let template = StatTemplate::parse("{delta} {unit}").unwrap();
        assert_eq!(template.render(&values(Percent::Undefined)), "2.5 ms");
    }

    #[test]
    fn test_escaped_braces() {
        let template = StatTemplate::parse("{{{delta:.1}}}").unwrap();
        assert_eq!(template.render(&values(Percent::Undefined)), "{2.5}");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            StatTemplate::parse("{delta").unwrap_err(),
            TemplateError::Unclosed(0)
        );
        assert_eq!(
            StatTemplate::parse("ms }").unwrap_err(),
            TemplateError::UnmatchedClose(3)
        );
        assert_eq!(
            StatTemplate::parse("{elapsed}").unwrap_err(),
            TemplateError::UnknownField("elapsed".to_string())
        );
        assert_eq!(
            StatTemplate::parse("{delta:>8}").unwrap_err(),
            TemplateError::InvalidSpec {
                field: "delta".to_string(),
                spec: ">8".to_string()
            }
        );
    }

    #[test]
    fn test_percent_of_zero_parent() {
        assert_eq!(Percent::of(5.0, 0.0), Percent::Undefined);
        assert_eq!(Percent::of(20.0, 100.0).value(), Some(20.0));
    }
}
