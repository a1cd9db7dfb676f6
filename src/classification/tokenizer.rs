//! 記事テキストの正規化と n-gram トークナイズ。
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// 2文字以上の英数字の連続を1語とみなす。
static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]{2,}").expect("compile word pattern"));

/// n-gram の範囲（両端を含む）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NgramRange {
    pub min: usize,
    pub max: usize,
}

impl NgramRange {
    /// unigram + bigram。
    pub const UNI_BI: Self = Self { min: 1, max: 2 };
}

impl Default for NgramRange {
    fn default() -> Self {
        Self::UNI_BI
    }
}

fn normalize_text(input: &str) -> String {
    input.nfc().collect::<String>().to_lowercase()
}

/// 文書をターム列へ変換するトークナイザ。
#[derive(Debug, Clone, Copy, Default)]
pub struct TermTokenizer {
    ngrams: NgramRange,
}

impl TermTokenizer {
    #[must_use]
    pub fn new(ngrams: NgramRange) -> Self {
        Self { ngrams }
    }

    /// 正規化済みの単語列を返す。
    #[must_use]
    pub fn words(text: &str) -> Vec<String> {
        let normalized = normalize_text(text);
        WORD_RE
            .find_iter(&normalized)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// 単語列から連続 n-gram を出現順に生成する。bigram は空白1つで連結する。
    #[must_use]
    pub fn terms(&self, text: &str) -> Vec<String> {
        let words = Self::words(text);
        let mut terms = Vec::with_capacity(words.len() * (self.ngrams.max - self.ngrams.min + 1));
        for n in self.ngrams.min.max(1)..=self.ngrams.max {
            if n == 1 {
                terms.extend(words.iter().cloned());
                continue;
            }
            terms.extend(words.windows(n).map(|window| window.join(" ")));
        }
        terms
    }
}
