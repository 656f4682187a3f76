//! Role heuristics for extracted entity names.
//!
//! Matching is a case-insensitive substring test after folding Turkish dotted
//! and dotless I, so "İCRA MÜDÜRLÜĞÜ", "icra müdürlüğü" and "Icra Mudurlugu"
//! variants with the same letters compare equal.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRole {
    /// Authority the reply is addressed to
    Addressee,
    /// File, case or enforcement number
    CaseRef,
    Other,
}

const CASE_REF_TOKENS: &[&str] = &[
    "dosya",
    "esas",
    "karar no",
    "takip no",
    "numara",
    "file",
    "case",
    "enforcement",
];

const ADDRESSEE_TOKENS: &[&str] = &[
    "mahkeme",
    "müdürlüğü",
    "müdürlük",
    "daire",
    "kurum",
    "başkanlığı",
    "başkanlık",
    "savcılığı",
    "savcılık",
    "bakanlığı",
    "valiliği",
    "kaymakamlığı",
    "belediye",
    "noterliği",
    "court",
    "office",
    "institution",
    "directorate",
];

/// Lowercase with Turkish I variants collapsed to `i`.
pub fn fold(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            'İ' | 'I' | 'ı' => vec!['i'],
            // Combining dot left behind by lowercasing 'İ' elsewhere
            '\u{0307}' => vec![],
            other => other.to_lowercase().collect(),
        })
        .collect()
}

fn contains_any(haystack: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| haystack.contains(&fold(t)))
}

/// Classify an entity by its name. Case references win over addressees, so
/// "Mahkeme Esas No" is a reference, not an authority.
pub fn classify_entity_role(name: &str) -> EntityRole {
    let folded = fold(name);

    if contains_any(&folded, CASE_REF_TOKENS) {
        EntityRole::CaseRef
    } else if contains_any(&folded, ADDRESSEE_TOKENS) {
        EntityRole::Addressee
    } else {
        EntityRole::Other
    }
}

/// Whether free text mentions an authority, e.g. "Ankara 1. İcra Müdürlüğü".
pub fn names_authority(text: &str) -> bool {
    contains_any(&fold(text), ADDRESSEE_TOKENS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addressee_tokens() {
        assert_eq!(classify_entity_role("İcra Müdürlüğü"), EntityRole::Addressee);
        assert_eq!(classify_entity_role("ASLİYE HUKUK MAHKEMESİ"), EntityRole::Addressee);
        assert_eq!(classify_entity_role("Vergi Dairesi"), EntityRole::Addressee);
        assert_eq!(classify_entity_role("Issuing Office"), EntityRole::Addressee);
        assert_eq!(classify_entity_role("SGK İl Müdürlüğü"), EntityRole::Addressee);
    }

    #[test]
    fn test_case_reference_tokens() {
        assert_eq!(classify_entity_role("Dosya No"), EntityRole::CaseRef);
        assert_eq!(classify_entity_role("ESAS NUMARASI"), EntityRole::CaseRef);
        assert_eq!(classify_entity_role("Enforcement number"), EntityRole::CaseRef);
        assert_eq!(classify_entity_role("Takip No"), EntityRole::CaseRef);
    }

    #[test]
    fn test_case_reference_beats_addressee() {
        assert_eq!(classify_entity_role("Mahkeme Esas No"), EntityRole::CaseRef);
        assert_eq!(classify_entity_role("İcra Dairesi Dosya No"), EntityRole::CaseRef);
    }

    #[test]
    fn test_other_names() {
        assert_eq!(classify_entity_role("Borçlu"), EntityRole::Other);
        assert_eq!(classify_entity_role("Tutar"), EntityRole::Other);
        assert_eq!(classify_entity_role(""), EntityRole::Other);
    }

    #[test]
    fn test_fold_handles_turkish_i() {
        assert_eq!(fold("İSTANBUL"), "istanbul");
        assert_eq!(fold("KIRIKKALE"), "kirikkale");
        assert_eq!(fold("Başkanlığı"), "başkanliği");
    }

    #[test]
    fn test_names_authority() {
        assert!(names_authority("Ankara 1. İcra Müdürlüğü"));
        assert!(!names_authority("Ankara 1."));
    }
}
