use flowexpr_ast::Bits;
use std::fmt;

/// One `(symbol, value)` equality a match tests, as a map entry — the
/// value side of a [`MatchRecord`]'s fields. Always a fully-specified
/// bit pattern once it reaches a record: string operands are resolved to
/// a numeric id before a field ever enters a [`MatchRecord`].
pub type EqualityValue = Bits;

/// Identifies one allocated conjunctive-match group and this record's
/// position within it: dimension `dim` of `of` total dimensions (§4.6
/// step 3). A single match can carry more than one tag only in the
/// degenerate case where the same clause set happens to be grouped twice
/// under different symbols, which the emitter does not currently produce,
/// but the type does not rule it out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConjunctionTag {
    pub id: u32,
    pub dim: u32,
    pub of: u32,
}

impl fmt::Display for ConjunctionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conjunction({}, {}/{})", self.id, self.dim, self.of)
    }
}

/// A fully hash-consed canonical key for a match's field contents:
/// `(symbol, value)` pairs sorted by symbol name so that two
/// differently-constructed but field-identical matches collide in the
/// output map regardless of the order their equalities were discovered in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MatchKey(Vec<(String, EqualityValue)>);

impl MatchKey {
    pub fn from_fields(fields: &indexmap::IndexMap<String, EqualityValue>) -> Self {
        let mut entries: Vec<(String, EqualityValue)> = fields.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        MatchKey(entries)
    }
}

/// One emitted classifier match: the set of fields it tests and whatever
/// conjunction-group tags apply to it. Two matches with identical field
/// contents are always merged into one record by the emitter, concatenating
/// their tags (§4.6: "duplicates ... are merged by concatenating their
/// conjunction annotations").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchRecord {
    pub fields: indexmap::IndexMap<String, EqualityValue>,
    pub conjunctions: Vec<ConjunctionTag>,
}

impl MatchRecord {
    pub fn wildcard() -> Self {
        MatchRecord { fields: indexmap::IndexMap::new(), conjunctions: Vec::new() }
    }

    pub fn key(&self) -> MatchKey {
        MatchKey::from_fields(&self.fields)
    }

    pub fn merge_tags(&mut self, other: &MatchRecord) {
        for tag in &other.conjunctions {
            if !self.conjunctions.contains(tag) {
                self.conjunctions.push(*tag);
            }
        }
    }
}

impl fmt::Display for MatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            f.write_str("*")?;
        } else {
            let mut sorted: Vec<_> = self.fields.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            for (i, (symbol, bits)) in sorted.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{symbol}={bits}")?;
            }
        }
        for tag in &self.conjunctions {
            write!(f, " {tag}")?;
        }
        Ok(())
    }
}
