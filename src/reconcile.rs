use crate::decode::{ProtocolEntry, Roster};

const PLACEHOLDER_PREFIX: &str = "Unknown_";
const PLACEHOLDER_TAIL: usize = 6;

/// One line of the output file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultRow {
    pub name: String,
    pub category: String,
}

impl ResultRow {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub rows: Vec<ResultRow>,
    /// Protocol entries whose id was not on the roster.
    pub missing: usize,
}

/// Name used for a ranked athlete the roster doesn't know: `Unknown_` plus the last six
/// characters of the id.
pub fn placeholder_name(user_id: &str) -> String {
    let skip = user_id.chars().count().saturating_sub(PLACEHOLDER_TAIL);
    let tail: String = user_id.chars().skip(skip).collect();
    format!("{PLACEHOLDER_PREFIX}{tail}")
}

/// Joins the rank-ordered protocol against the roster. One row per protocol entry, in protocol
/// order; roster members without a protocol entry produce nothing.
pub fn reconcile(protocol: &[ProtocolEntry], roster: &Roster, category: &str) -> Reconciled {
    let mut missing = 0;
    let rows = protocol
        .iter()
        .map(|entry| {
            let name = match roster.get(&entry.user_id) {
                Some(name) => name.clone(),
                None => {
                    missing += 1;
                    placeholder_name(&entry.user_id)
                }
            };
            ResultRow::new(name, category)
        })
        .collect();

    Reconciled { rows, missing }
}
