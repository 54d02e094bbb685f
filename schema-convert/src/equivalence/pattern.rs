use std::fmt;

/// A field-path pattern. Segments are literal keys or indices, or `*`
/// matching any single segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('.')
            .map(|segment| match segment {
                "*" | "#" => Segment::Wildcard,
                literal => Segment::Literal(literal.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the concrete path `a.0.b` matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let mut parts = path.split('.');
        for segment in &self.segments {
            match (segment, parts.next()) {
                (_, None) => return false,
                (Segment::Wildcard, Some(_)) => {}
                (Segment::Literal(lit), Some(part)) if lit == part => {}
                _ => return false,
            }
        }
        parts.next().is_none()
    }

    /// Number of literal segments. Higher means more specific.
    pub fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
