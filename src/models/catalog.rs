use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 商品档案行
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Item {
    pub item_code: String,
    pub item_name: String,
    pub description: Option<String>,
    pub stock_uom: Option<String>,
}

/// 往来单位档案行 (客户/供应商统一存储, 按 party_type 区分)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub party_name: String,
    pub party_type: String,
}

/// 匹配候选来源: 编码命中加权高于名称命中
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Code,
    Name,
}

/// 模糊匹配候选项: 每个商品展开为编码条目 + 名称条目
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub item_code: String,              // 匹配成功后写回的编码
    pub match_text: String,             // 规整后的比对文本
    pub kind: MatchKind,
}

impl CatalogEntry {
    /// 从商品档案展开候选列表
    pub fn expand(items: &[Item]) -> Vec<CatalogEntry> {
        let mut entries = Vec::with_capacity(items.len() * 2);
        for item in items {
            if !item.item_code.is_empty() {
                entries.push(CatalogEntry {
                    item_code: item.item_code.clone(),
                    match_text: normalize(&item.item_code),
                    kind: MatchKind::Code,
                });
            }
            if !item.item_name.is_empty()
                && item.item_name.to_lowercase() != item.item_code.to_lowercase()
            {
                entries.push(CatalogEntry {
                    item_code: item.item_code.clone(),
                    match_text: normalize(&item.item_name),
                    kind: MatchKind::Name,
                });
            }
        }
        entries
    }
}

/// 去掉方括号并转小写
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '[' && *c != ']')
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(code: &str, name: &str) -> Item {
        Item {
            item_code: code.to_string(),
            item_name: name.to_string(),
            description: None,
            stock_uom: None,
        }
    }

    #[test]
    fn expand_emits_code_and_name_entries() {
        let entries = CatalogEntry::expand(&[item("MED-001", "Paracetamol Syrup")]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, MatchKind::Code);
        assert_eq!(entries[0].match_text, "med-001");
        assert_eq!(entries[1].kind, MatchKind::Name);
        assert_eq!(entries[1].match_text, "paracetamol syrup");
        // 两个条目都指向同一商品编码
        assert!(entries.iter().all(|e| e.item_code == "MED-001"));
    }

    #[test]
    fn expand_skips_name_equal_to_code() {
        let entries = CatalogEntry::expand(&[item("MED-001", "med-001")]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, MatchKind::Code);
    }

    #[test]
    fn normalize_strips_brackets() {
        assert_eq!(normalize("[MED-001] Tablet"), "med-001 tablet");
        assert_eq!(normalize("  Plain  "), "plain");
    }
}
