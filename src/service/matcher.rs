use crate::models::catalog::normalize;
use crate::models::{CatalogEntry, MatchKind, Party};
use regex::Regex;

/// 商品匹配结果
#[derive(Debug, Clone)]
pub struct ItemMatch {
    pub item_code: String,
    pub score: f64,
    pub kind: MatchKind,
}

/// 往来单位匹配结果
#[derive(Debug, Clone)]
pub struct PartyMatch {
    pub name: String,
    pub score: f64,
}

/// 模糊匹配器: 归一化编辑距离打分 (0-100)
/// 编码命中加权高于名称命中, 低置信度一律放弃
pub struct FuzzyMatcher {
    bracket: Regex,
}

impl FuzzyMatcher {
    pub fn new() -> Self {
        Self {
            bracket: Regex::new(r"\[(.*?)\]").expect("static pattern"),
        }
    }

    /// 相似度: 1 - 编辑距离/较长串长度, 映射到 0-100
    pub fn similarity(a: &str, b: &str) -> f64 {
        let len_a = a.chars().count();
        let len_b = b.chars().count();
        let max_len = len_a.max(len_b);
        if max_len == 0 {
            return 100.0;
        }
        let dist = levenshtein(a, b);
        (1.0 - dist as f64 / max_len as f64) * 100.0
    }

    /// 方括号内文本 (票面描述中嵌入商品编码的惯例)
    pub fn extract_bracket_text<'a>(&self, description: &'a str) -> Option<&'a str> {
        self.bracket
            .captures(description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// 商品匹配: 全量候选里取最高分
    /// 低于70分放弃, 再尝试方括号文本重试一次
    pub fn match_item(&self, text: &str, entries: &[CatalogEntry]) -> Option<ItemMatch> {
        if text.is_empty() {
            return None;
        }

        let clean = normalize(text);
        let mut best: Option<ItemMatch> = None;

        for entry in entries {
            let mut score = Self::similarity(&clean, &entry.match_text);
            // 编码命中加权 20%, 上限 100
            if entry.kind == MatchKind::Code {
                score = (score * 1.2).min(100.0);
            }

            if best.as_ref().map(|b| score > b.score).unwrap_or(true) {
                best = Some(ItemMatch {
                    item_code: entry.item_code.clone(),
                    score,
                    kind: entry.kind,
                });
            }
        }

        match best {
            Some(m) if m.score > 70.0 => Some(m),
            _ => match self.extract_bracket_text(text) {
                Some(bracket) if bracket != text => self.match_item(bracket, entries),
                _ => None,
            },
        }
    }

    /// 往来单位匹配: 80分以下视为未命中
    pub fn match_party(&self, raw_name: &str, parties: &[Party]) -> Option<PartyMatch> {
        if raw_name.is_empty() {
            return None;
        }

        let clean = raw_name.to_lowercase().trim().to_string();
        let mut best: Option<PartyMatch> = None;

        for party in parties {
            let score = Self::similarity(&clean, &party.party_name.to_lowercase());
            if best.as_ref().map(|b| score > b.score).unwrap_or(true) {
                best = Some(PartyMatch {
                    name: party.name.clone(),
                    score,
                });
            }
        }

        best.filter(|b| b.score > 80.0)
    }
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// 经典两行DP编辑距离, 按字符计
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;

    fn entries() -> Vec<CatalogEntry> {
        CatalogEntry::expand(&[
            Item {
                item_code: "MED-001".to_string(),
                item_name: "Tramadol Tablet 100mg".to_string(),
                description: None,
                stock_uom: None,
            },
            Item {
                item_code: "MED-002".to_string(),
                item_name: "Paracetamol Syrup 250ml".to_string(),
                description: None,
                stock_uom: None,
            },
        ])
    }

    fn party(name: &str, party_name: &str) -> Party {
        Party {
            name: name.to_string(),
            party_name: party_name.to_string(),
            party_type: "Customer".to_string(),
        }
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn similarity_bounds() {
        assert_eq!(FuzzyMatcher::similarity("", ""), 100.0);
        assert_eq!(FuzzyMatcher::similarity("abc", "abc"), 100.0);
        assert_eq!(FuzzyMatcher::similarity("abc", ""), 0.0);
        let s = FuzzyMatcher::similarity("paracetamol", "paracetamole");
        assert!(s > 90.0 && s < 100.0);
    }

    #[test]
    fn bracket_text_extraction() {
        let m = FuzzyMatcher::new();
        assert_eq!(m.extract_bracket_text("Tablet [MED-001] 10x"), Some("MED-001"));
        assert_eq!(m.extract_bracket_text("no brackets"), None);
        assert_eq!(m.extract_bracket_text("empty []"), Some(""));
    }

    #[test]
    fn exact_name_matches_item() {
        let m = FuzzyMatcher::new();
        let found = m.match_item("Paracetamol Syrup 250ml", &entries()).unwrap();
        assert_eq!(found.item_code, "MED-002");
        assert!(found.score > 95.0);
    }

    #[test]
    fn code_match_gets_boost() {
        let m = FuzzyMatcher::new();
        let found = m.match_item("MED-001", &entries()).unwrap();
        assert_eq!(found.item_code, "MED-001");
        assert_eq!(found.kind, MatchKind::Code);
        assert_eq!(found.score, 100.0);
    }

    #[test]
    fn garbage_matches_nothing() {
        let m = FuzzyMatcher::new();
        assert!(m.match_item("zzzz qqqq 9999", &entries()).is_none());
        assert!(m.match_item("", &entries()).is_none());
    }

    #[test]
    fn low_score_retries_bracket_text() {
        let m = FuzzyMatcher::new();
        // 全文相似度过低, 但方括号里是精确编码
        let found = m
            .match_item("Completely unrelated wording [MED-001]", &entries())
            .unwrap();
        assert_eq!(found.item_code, "MED-001");
    }

    #[test]
    fn party_match_respects_threshold() {
        let m = FuzzyMatcher::new();
        let parties = vec![
            party("CUST-0001", "Global Health Supplies"),
            party("CUST-0002", "Bluechem Limited"),
        ];

        let found = m.match_party("Global Health Supplies", &parties).unwrap();
        assert_eq!(found.name, "CUST-0001");

        // 轻微OCR噪声仍应命中
        let found = m.match_party("Global Health Suppliez", &parties).unwrap();
        assert_eq!(found.name, "CUST-0001");

        assert!(m.match_party("Totally Different Name", &parties).is_none());
        assert!(m.match_party("", &parties).is_none());
    }
}
