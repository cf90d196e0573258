//! ## Schema Registry
//!
//! Declarative rule tables for the raw real-estate dataset: which imputation rule governs each
//! column and how each categorical column is encoded. The transformers read these tables; they do
//! not hard-code any column names themselves.
//!
//! [`validate`] checks the tables for internal consistency: every governed column belongs to
//! exactly one imputation group, no column carries two encodings, no encoded column is dropped and
//! no ordinal table is empty.

use crate::exceptions::{ImmoError, ImmoResult};
use std::collections::HashSet;

/// How missing values of a column group are filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImputationRule {
    /// Fill with a literal string.
    Sentinel(&'static str),
    /// Fill with the column mean (numeric columns).
    Mean,
    /// Fill with the most frequent value.
    Mode,
    /// Fill with `0`.
    Zero,
    /// Remove the column altogether.
    Drop,
}

/// A named set of columns sharing one imputation rule.
#[derive(Debug, Clone, Copy)]
pub struct ImputationGroup {
    pub rule: ImputationRule,
    pub columns: &'static [&'static str],
}

/// Hand-authored value to integer table for one ordinal vocabulary.
#[derive(Debug, PartialEq)]
pub struct OrdinalTable {
    pub name: &'static str,
    pub entries: &'static [(&'static str, i64)],
}

impl OrdinalTable {
    /// Looks up the integer code of a category.
    pub fn code(&self, value: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(key, _)| *key == value)
            .map(|(_, code)| *code)
    }
}

/// How a categorical column is turned into numeric or boolean form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncodingRule {
    /// One boolean column per observed value, named `<column>_<value>`.
    OneHot,
    /// In-place integer code from a fixed table.
    Ordinal(&'static OrdinalTable),
    /// Two-valued code mapped to a boolean.
    Flag {
        truthy: &'static str,
        falsy: &'static str,
    },
}

/// Literal used to fill categorical columns where missing means "no such feature".
pub const NONE_SENTINEL: &str = "None";

/// Imputation groups in application order. The `Mauerwerktyp` sentinel and the drops run
/// before the mode group.
pub const IMPUTATION_GROUPS: &[ImputationGroup] = &[
    ImputationGroup {
        rule: ImputationRule::Sentinel(NONE_SENTINEL),
        columns: &[
            "Zufahrtsweg",
            "Kaminqualitaet",
            "Zaunqualitaet",
            "Poolqualitaet",
            "Sondermerkmal",
            "Garagenzustand",
            "Garageninnenausbau",
            "Garagenqualitaet",
            "Garagentyp",
            "Kellerbelichtung",
            "Kellerzustand",
            "Kellerhoehe",
            "Kellerbereich1",
            "Kellerbereich2",
        ],
    },
    ImputationGroup {
        rule: ImputationRule::Mean,
        columns: &["Strassenlaenge"],
    },
    ImputationGroup {
        rule: ImputationRule::Sentinel("Kein"),
        columns: &["Mauerwerktyp"],
    },
    ImputationGroup {
        rule: ImputationRule::Drop,
        columns: &["Garagenbaujahr", "Id"],
    },
    ImputationGroup {
        rule: ImputationRule::Mode,
        columns: &[
            "Wohngebiet",
            "Funktionalitaet",
            "Versorgung",
            "KuechenQualitaet",
            "Elektrik",
            "Verkaufstyp",
        ],
    },
    ImputationGroup {
        rule: ImputationRule::Zero,
        columns: &[
            "KellerHalbbadezimmer",
            "KellerVollbadezimmer",
            "Garagenflaeche",
            "KellerbereichgroesseGes",
            "KellerbereichgroesseNAu",
            "Kellerbereichgroesse2",
            "Kellerbereichgroesse1",
            "Garagenautos",
            "Mauerwerkflaeche",
        ],
    },
];

pub static VERSORGUNG: OrdinalTable = OrdinalTable {
    name: "versorgung",
    entries: &[("E", 0), ("EG", 1), ("EGW", 2), ("EGWA", 3)],
};

pub static GRUNDSTUECKSFORM: OrdinalTable = OrdinalTable {
    name: "grundstuecksform",
    entries: &[("IR3", 0), ("UR2", 1), ("UR1", 2), ("Reg", 3)],
};

pub static GELAENDENEIGUNG: OrdinalTable = OrdinalTable {
    name: "gelaendeneigung",
    entries: &[("San", 0), ("Mit", 1), ("Sta", 2)],
};

pub static AUSSEN_QUALITAET: OrdinalTable = OrdinalTable {
    name: "aussen_qualitaet",
    entries: &[("Sc", 0), ("Ar", 1), ("Du", 2), ("Gu", 3), ("Ag", 4)],
};

pub static KELLER_QUALITAET: OrdinalTable = OrdinalTable {
    name: "keller_qualitaet",
    entries: &[
        ("None", 0),
        ("Sc", 1),
        ("Ar", 2),
        ("Ty", 3),
        ("Gu", 4),
        ("Ag", 5),
    ],
};

// Du and Gu share a code.
pub static KELLERBELICHTUNG: OrdinalTable = OrdinalTable {
    name: "kellerbelichtung",
    entries: &[("None", 0), ("Ke", 1), ("Mn", 2), ("Du", 3), ("Gu", 3)],
};

pub static KELLERBEREICH: OrdinalTable = OrdinalTable {
    name: "kellerbereich",
    entries: &[
        ("None", 0),
        ("NAu", 1),
        ("SQ", 2),
        ("DAR", 3),
        ("UWR", 4),
        ("DWR", 5),
        ("GWR", 6),
    ],
};

pub static GARAGEN: OrdinalTable = OrdinalTable {
    name: "garagen",
    entries: &[
        ("None", 0),
        ("Sc", 1),
        ("Ar", 2),
        ("Du", 3),
        ("Gu", 4),
        ("Ag", 5),
    ],
};

pub static GARAGEN_INNEN: OrdinalTable = OrdinalTable {
    name: "garagen_innen",
    entries: &[("None", 0), ("NAu", 1), ("GAu", 2), ("Aus", 3)],
};

pub static POOL: OrdinalTable = OrdinalTable {
    name: "pool",
    entries: &[("None", 0), ("Ar", 1), ("Du", 2), ("Gu", 3), ("Ag", 4)],
};

pub static FUNKTIONALITAET: OrdinalTable = OrdinalTable {
    name: "funktionalitaet",
    entries: &[
        ("Ber", 0),
        ("Sch", 1),
        ("Gro2", 2),
        ("Gro1", 3),
        ("Mit", 4),
        ("Ger2", 5),
        ("Ger1", 6),
        ("Typ", 7),
    ],
};

/// Encoding rule per categorical column. One-hot columns are listed first, in the order their
/// indicator columns are emitted.
pub static ENCODING_RULES: &[(&str, EncodingRule)] = &[
    ("Wohngebiet", EncodingRule::OneHot),
    ("Nachbarschaft", EncodingRule::OneHot),
    ("Bedingung1", EncodingRule::OneHot),
    ("Bedingung2", EncodingRule::OneHot),
    ("Gebauedetyp", EncodingRule::OneHot),
    ("Wohnungsstil", EncodingRule::OneHot),
    ("Gelaendekontur", EncodingRule::OneHot),
    ("Grundstueckanordnung", EncodingRule::OneHot),
    ("Strassentyp", EncodingRule::OneHot),
    ("Zufahrtsweg", EncodingRule::OneHot),
    ("Fundament", EncodingRule::OneHot),
    ("Mauerwerktyp", EncodingRule::OneHot),
    ("Verkleidung1", EncodingRule::OneHot),
    ("Verkleidung2", EncodingRule::OneHot),
    ("Dachtyp", EncodingRule::OneHot),
    ("Dachmeterial", EncodingRule::OneHot),
    ("Heizung", EncodingRule::OneHot),
    ("Elektrik", EncodingRule::OneHot),
    ("Zaunqualitaet", EncodingRule::OneHot),
    ("Garagentyp", EncodingRule::OneHot),
    ("EinfahrtGepflastert", EncodingRule::OneHot),
    ("Sondermerkmal", EncodingRule::OneHot),
    ("Verkaufstyp", EncodingRule::OneHot),
    ("Verkaufsbedingung", EncodingRule::OneHot),
    ("Versorgung", EncodingRule::Ordinal(&VERSORGUNG)),
    ("Grundstuecksform", EncodingRule::Ordinal(&GRUNDSTUECKSFORM)),
    ("Gelaendeneigung", EncodingRule::Ordinal(&GELAENDENEIGUNG)),
    ("Aussenmaterialqualitaet", EncodingRule::Ordinal(&AUSSEN_QUALITAET)),
    ("Aussenmaterialzustand", EncodingRule::Ordinal(&AUSSEN_QUALITAET)),
    ("Heizungsqualitaet", EncodingRule::Ordinal(&AUSSEN_QUALITAET)),
    ("KuechenQualitaet", EncodingRule::Ordinal(&AUSSEN_QUALITAET)),
    ("Kellerhoehe", EncodingRule::Ordinal(&KELLER_QUALITAET)),
    ("Kellerzustand", EncodingRule::Ordinal(&KELLER_QUALITAET)),
    ("Kellerbelichtung", EncodingRule::Ordinal(&KELLERBELICHTUNG)),
    ("Kellerbereich1", EncodingRule::Ordinal(&KELLERBEREICH)),
    ("Kellerbereich2", EncodingRule::Ordinal(&KELLERBEREICH)),
    ("Garagenqualitaet", EncodingRule::Ordinal(&GARAGEN)),
    ("Garagenzustand", EncodingRule::Ordinal(&GARAGEN)),
    ("Kaminqualitaet", EncodingRule::Ordinal(&GARAGEN)),
    ("Garageninnenausbau", EncodingRule::Ordinal(&GARAGEN_INNEN)),
    ("Poolqualitaet", EncodingRule::Ordinal(&POOL)),
    ("Funktionalitaet", EncodingRule::Ordinal(&FUNKTIONALITAET)),
    (
        "Klimalanlage",
        EncodingRule::Flag {
            truthy: "J",
            falsy: "N",
        },
    ),
];

/// Returns the imputation rule governing `column`, if any.
pub fn imputation_rule_for(column: &str) -> Option<ImputationRule> {
    IMPUTATION_GROUPS
        .iter()
        .find(|group| group.columns.contains(&column))
        .map(|group| group.rule)
}

/// Returns the encoding rule of `column`, if any.
pub fn encoding_rule_for(column: &str) -> Option<EncodingRule> {
    ENCODING_RULES
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, rule)| *rule)
}

/// All columns the rule tables reference, in first-seen order. A raw dataset must contain at
/// least these columns.
pub fn governed_columns() -> Vec<&'static str> {
    let mut seen = HashSet::new();
    IMPUTATION_GROUPS
        .iter()
        .flat_map(|group| group.columns.iter().copied())
        .chain(ENCODING_RULES.iter().map(|(name, _)| *name))
        .filter(|name| seen.insert(*name))
        .collect()
}

/// Checks the rule tables for internal consistency.
pub fn validate() -> ImmoResult<()> {
    validate_tables(IMPUTATION_GROUPS, ENCODING_RULES)
}

/// Consistency check over arbitrary tables; [`validate`] applies it to the built-in ones.
pub fn validate_tables(
    groups: &[ImputationGroup],
    encodings: &[(&str, EncodingRule)],
) -> ImmoResult<()> {
    let mut imputed = HashSet::new();
    let mut dropped = HashSet::new();
    for group in groups {
        for column in group.columns {
            if !imputed.insert(*column) {
                return Err(ImmoError::InvalidParameter(format!(
                    "Column '{}' belongs to more than one imputation group",
                    column
                )));
            }
            if group.rule == ImputationRule::Drop {
                dropped.insert(*column);
            }
        }
    }

    let mut encoded = HashSet::new();
    for (column, rule) in encodings {
        if !encoded.insert(*column) {
            return Err(ImmoError::InvalidParameter(format!(
                "Column '{}' has more than one encoding rule",
                column
            )));
        }
        if dropped.contains(column) {
            return Err(ImmoError::InvalidParameter(format!(
                "Column '{}' is dropped during imputation but also encoded",
                column
            )));
        }
        match rule {
            EncodingRule::Ordinal(table) if table.entries.is_empty() => {
                return Err(ImmoError::InvalidParameter(format!(
                    "Ordinal table '{}' for column '{}' is empty",
                    table.name, column
                )));
            }
            EncodingRule::Flag { truthy, falsy } if truthy == falsy => {
                return Err(ImmoError::InvalidParameter(format!(
                    "Flag column '{}' uses '{}' for both states",
                    column, truthy
                )));
            }
            _ => {}
        }
    }
    Ok(())
}
