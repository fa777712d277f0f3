//! Culture classification of resource file names.
//!
//! `Strings.resx` is the neutral (fallback) store, `Strings.ru.resx` and
//! `Strings.en-US.resx` are culture-specific ones. Anything whose trailing
//! segment is not a known locale is not part of a resource group at all.

use std::{collections::BTreeSet, fmt::Display, path::Path};

use lazy_static::lazy_static;
use unic_langid::LanguageIdentifier;

use crate::error::Error;

lazy_static! {
    /// Language subtags accepted as cultures: ISO 639-1 plus the ISO 639-2/3
    /// codes that have no two-letter form but ship with common locale data.
    static ref KNOWN_LANGUAGES: BTreeSet<&'static str> = {
        let mut set = BTreeSet::new();
        for code in [
            "aa","ab","ae","af","ak","am","an","ar","as","av","ay","az","ba","be","bg","bh",
            "bi","bm","bn","bo","br","bs","ca","ce","ch","co","cr","cs","cu","cv","cy","da",
            "de","dv","dz","ee","el","en","eo","es","et","eu","fa","ff","fi","fj","fo","fr",
            "fy","ga","gd","gl","gn","gu","gv","ha","he","hi","ho","hr","ht","hu","hy","hz",
            "ia","id","ie","ig","ii","ik","io","is","it","iu","ja","jv","ka","kg","ki","kj",
            "kk","kl","km","kn","ko","kr","ks","ku","kv","kw","ky","la","lb","lg","li","ln",
            "lo","lt","lu","lv","mg","mh","mi","mk","ml","mn","mr","ms","mt","my","na","nb",
            "nd","ne","ng","nl","nn","no","nr","nv","ny","oc","oj","om","or","os","pa","pi",
            "pl","ps","pt","qu","rm","rn","ro","ru","rw","sa","sc","sd","se","sg","si","sk",
            "sl","sm","sn","so","sq","sr","ss","st","su","sv","sw","ta","te","tg","th","ti",
            "tk","tl","tn","to","tr","ts","tt","tw","ty","ug","uk","ur","uz","ve","vi","vo",
            "wa","wo","xh","yi","yo","za","zh","zu",
        ] {
            set.insert(code);
        }
        for code in [
            "arn","ast","ceb","chr","ckb","dsb","fil","gsw","haw","hsb","ibb","kab","kea",
            "kok","mas","moh","nso","prs","quc","quz","sah","sma","smj","smn","sms","syr",
            "tzm","yue",
        ] {
            set.insert(code);
        }
        set
    };
}

/// The culture a resource store belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Culture {
    /// The default/fallback store (no culture segment in the file name).
    Neutral,
    /// A validated locale tag such as `ru` or `en-US`.
    Tag(LanguageIdentifier),
}

impl Culture {
    pub fn is_neutral(&self) -> bool {
        matches!(self, Culture::Neutral)
    }

    /// Human-friendly name: `"neutral"` or the canonical tag.
    pub fn name(&self) -> String {
        match self {
            Culture::Neutral => "neutral".to_string(),
            Culture::Tag(tag) => tag.to_string(),
        }
    }
}

impl Display for Culture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

/// Classifies a resource file base name (without extension).
///
/// # Example
/// ```rust
/// use resxtract::culture::{classify, Culture};
/// assert_eq!(classify("Strings").unwrap(), Culture::Neutral);
/// assert_eq!(classify("Strings.ru").unwrap().name(), "ru");
/// assert!(classify("Strings.bogus!!").is_err());
/// ```
pub fn classify(base_name: &str) -> Result<Culture, Error> {
    if base_name.is_empty() {
        return Err(Error::NotAResourceFile(base_name.to_string()));
    }

    match base_name.rsplit_once('.') {
        None => Ok(Culture::Neutral),
        Some((_, candidate)) => parse_culture_tag(candidate)
            .map(Culture::Tag)
            .ok_or_else(|| Error::NotAResourceFile(base_name.to_string())),
    }
}

/// Classifies a resource file by its path, ignoring the directory and extension.
pub fn classify_path<P: AsRef<Path>>(path: P) -> Result<Culture, Error> {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::NotAResourceFile(path.display().to_string()))?;
    classify(stem)
}

/// Validates a locale tag against the embedded language table.
pub fn parse_culture_tag(candidate: &str) -> Option<LanguageIdentifier> {
    if candidate.is_empty() || candidate.contains('_') {
        return None;
    }
    let tag = candidate.parse::<LanguageIdentifier>().ok()?;
    if KNOWN_LANGUAGES.contains(tag.language.as_str()) {
        Some(tag)
    } else {
        None
    }
}

/// Strips a trailing culture segment: `Strings.ru` → `Strings`.
pub fn strip_culture(base_name: &str) -> &str {
    match base_name.rsplit_once('.') {
        Some((stem, candidate)) if parse_culture_tag(candidate).is_some() => stem,
        _ => base_name,
    }
}
