use crate::models::ExtractedItem;
use bigdecimal::{BigDecimal, Zero};
use regex::Regex;
use std::str::FromStr;

/// OCR文本解析器: 预编译全部正则
/// 明细提取按三层回退: 管道分隔表格 -> 费用清单 -> 通用数量扫描
pub struct InvoiceTextParser {
    qty_in_cell: Regex,
    rate_in_cell: Regex,
    table_row: Regex,
    charges_section: Regex,
    charge_row: Regex,
    fallback_qty: Regex,
    fallback_rate: Regex,
    partner_name: Regex,
    party_labels: Vec<Regex>,
    invoice_title: Regex,
    name_candidate: Regex,
    trailing_junk: Regex,
    surrounding_symbols: Regex,
    ellipses: Regex,
    whitespace: Regex,
    non_word: Regex,
}

const PARTY_LABELS: [&str; 6] = ["Customer", "Client", "Supplier", "Vendor", "Bill To", "Sold To"];

impl InvoiceTextParser {
    pub fn new() -> Self {
        let party_labels = PARTY_LABELS
            .iter()
            .map(|label| {
                Regex::new(&format!(r"(?i){}\s*:\s*([^\n]+)", label)).expect("static pattern")
            })
            .collect();

        Self {
            qty_in_cell: Regex::new(r"(\d+\.\d{3})").expect("static pattern"),
            rate_in_cell: Regex::new(r"(\d+\.\d{2,3})").expect("static pattern"),
            table_row: Regex::new(
                r"(?i)^(.+?)\s+(\d{1,3}(?:,\d{3})*\.\d{3})\s*(kg|Units)?\s+(\d{1,3}(?:,\d{3})*\.\d{2,3})\s+.*?\d+\.\d{2}",
            )
            .expect("static pattern"),
            charges_section: Regex::new(r"(?s)Custom Duties(.+?)Service Charges")
                .expect("static pattern"),
            charge_row: Regex::new(r"(\w[\w\s/-]+)\s+(\d{1,3}(?:,\d{3})*)\s+(\d{1,3}(?:,\d{3})*)")
                .expect("static pattern"),
            fallback_qty: Regex::new(r"(?i)(\d+,\d+\.\d{3}|\d+\.\d{3}|\d+)\s*(kg|Units)?")
                .expect("static pattern"),
            fallback_rate: Regex::new(r"(\d+,\d+\.\d{2,3}|\d+\.\d{2,3}|\d+)")
                .expect("static pattern"),
            partner_name: Regex::new(r"(?i)Partner\s*Name\s*:\s*([^\n]+)").expect("static pattern"),
            party_labels,
            invoice_title: Regex::new(r"(?i)Invoice\s+\w+/\d+/\d+").expect("static pattern"),
            name_candidate: Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+\b")
                .expect("static pattern"),
            trailing_junk: Regex::new(r"[^\w\s-]$").expect("static pattern"),
            surrounding_symbols: Regex::new(r"^\W+|\W+$").expect("static pattern"),
            ellipses: Regex::new(r"\.{3,}").expect("static pattern"),
            whitespace: Regex::new(r"\s+").expect("static pattern"),
            non_word: Regex::new(r"\W+").expect("static pattern"),
        }
    }

    /// 提取明细行
    pub fn extract_items(&self, text: &str) -> Vec<ExtractedItem> {
        let table_items = self.extract_table_items(text);
        if !table_items.is_empty() {
            return table_items;
        }

        let charge_items = self.extract_charges(text);
        if !charge_items.is_empty() {
            return charge_items;
        }

        self.extract_fallback(text)
    }

    /// 结构化表格: 表头含 QUANTITY / UNIT PRICE / AMOUNT
    fn extract_table_items(&self, text: &str) -> Vec<ExtractedItem> {
        let lines: Vec<&str> = text.lines().collect();
        let mut items = Vec::new();

        // 定位表头
        let start = lines.iter().position(|line| {
            line.contains("QUANTITY") && line.contains("UNIT PRICE") && line.contains("AMOUNT")
        });

        if let Some(header) = start {
            let start = header + 1;
            for line in lines.iter().skip(start).take(10) {
                if line.trim().is_empty() {
                    break;
                }

                // 管道分隔列
                let parts: Vec<&str> = line.split('|').map(|p| p.trim()).collect();
                if parts.len() < 4 {
                    continue;
                }

                let qty_cell = parts[1].replace(',', "");
                let rate_cell = parts[2].replace(',', "");

                let Some(qty) = self
                    .qty_in_cell
                    .captures(&qty_cell)
                    .and_then(|c| c.get(1))
                    .and_then(|m| parse_decimal(m.as_str()))
                else {
                    continue;
                };
                let Some(rate) = self
                    .rate_in_cell
                    .captures(&rate_cell)
                    .and_then(|c| c.get(1))
                    .and_then(|m| parse_decimal(m.as_str()))
                else {
                    continue;
                };

                let description = self.clean_description(parts[0]);
                if description.len() < 3 {
                    continue;
                }

                items.push(ExtractedItem {
                    description,
                    qty,
                    rate,
                });
            }
        }

        // 无管道分隔时尝试空白分隔的表格行
        if items.is_empty() {
            for line in &lines {
                let Some(caps) = self.table_row.captures(line) else {
                    continue;
                };
                let (Some(desc), Some(qty_m), Some(rate_m)) =
                    (caps.get(1), caps.get(2), caps.get(4))
                else {
                    continue;
                };

                let Some(qty) = parse_decimal(&qty_m.as_str().replace(',', "")) else {
                    continue;
                };
                let Some(rate) = parse_decimal(&rate_m.as_str().replace(',', "")) else {
                    continue;
                };

                let description = self.clean_description(desc.as_str());
                if description.len() < 3 {
                    continue;
                }

                items.push(ExtractedItem {
                    description,
                    qty,
                    rate,
                });
            }
        }

        items
    }

    /// 费用清单: PARTICULARS 段落, 委托方金额+垫付金额合并为单行费用
    fn extract_charges(&self, text: &str) -> Vec<ExtractedItem> {
        let mut items = Vec::new();
        let clean_text = self.whitespace.replace_all(text, " ");

        if !clean_text.contains("PARTICULARS") {
            return items;
        }

        let Some(section) = self
            .charges_section
            .captures(&clean_text)
            .and_then(|c| c.get(1))
        else {
            return items;
        };

        for caps in self.charge_row.captures_iter(section.as_str()) {
            let (Some(name), Some(consignee), Some(balance)) =
                (caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            let Some(consignee) = parse_decimal(&consignee.as_str().replace(',', "")) else {
                continue;
            };
            let Some(balance) = parse_decimal(&balance.as_str().replace(',', "")) else {
                continue;
            };

            let total = consignee + balance;
            if total > BigDecimal::zero() {
                items.push(ExtractedItem {
                    description: name.as_str().trim().to_string(),
                    qty: BigDecimal::from(1),
                    rate: total,
                });
            }
        }

        items
    }

    /// 兜底扫描: 全文找数量样式, 行首到数量为描述, 数量之后找单价
    fn extract_fallback(&self, text: &str) -> Vec<ExtractedItem> {
        let mut items = Vec::new();

        for caps in self.fallback_qty.captures_iter(text) {
            let (Some(whole), Some(qty_m)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let Some(qty) = parse_decimal(&qty_m.as_str().replace(',', "")) else {
                continue;
            };

            // 描述: 所在行行首到数量之间的文本
            let desc_start = text[..whole.start()]
                .rfind('\n')
                .map(|i| i + 1)
                .unwrap_or(0);
            let description = self.clean_description(&text[desc_start..whole.start()]);
            if description.len() < 3 {
                continue;
            }

            // 单价: 数量之后的100字节窗口内找下一个数字
            let mut window_end = (whole.end() + 100).min(text.len());
            while !text.is_char_boundary(window_end) {
                window_end -= 1;
            }
            let rate = self
                .fallback_rate
                .captures(&text[whole.end()..window_end])
                .and_then(|c| c.get(1))
                .and_then(|m| parse_decimal(&m.as_str().replace(',', "")))
                .unwrap_or_else(BigDecimal::zero);

            items.push(ExtractedItem {
                description,
                qty,
                rate,
            });
        }

        items
    }

    /// 提取往来单位名称
    pub fn extract_party(&self, text: &str) -> Option<String> {
        // 1. 显式 Partner Name 字段
        if let Some(party) = self.captured_label(&self.partner_name, text) {
            return Some(party);
        }

        // 2. 票面顶部最突出的名称 (通常是客户/供应商)
        let top_section = match text.split_once("Invoice Date:") {
            Some((before, _)) => before,
            None => prefix_chars(text, 500),
        };
        if let Some(name) = self.longest_name_candidate(top_section) {
            return Some(name);
        }

        // 3. 其他常见标签
        for label in &self.party_labels {
            if let Some(party) = self.captured_label(label, text) {
                return Some(party);
            }
        }

        // 4. 发票标题附近找名称
        if let Some(title) = self.invoice_title.find(text) {
            let start = title.start().saturating_sub(100);
            let start = floor_char_boundary(text, start);
            let end = floor_char_boundary(text, (title.end() + 100).min(text.len()));
            if let Some(name) = self.longest_name_candidate(&text[start..end]) {
                return Some(name);
            }
        }

        None
    }

    /// 按关键词取行尾字段值 (发票号/日期/合计)
    pub fn extract_keyword(&self, text: &str, keys: &[&str]) -> Option<String> {
        for line in text.lines() {
            let lower = line.to_lowercase();
            for key in keys {
                if lower.contains(&key.to_lowercase()) {
                    return line.split_whitespace().last().map(|s| s.to_string());
                }
            }
        }
        None
    }

    /// 去重键: 去掉所有非单词字符并转小写
    pub fn normalize_description(&self, description: &str) -> String {
        self.non_word
            .replace_all(&description.to_lowercase(), "")
            .to_string()
    }

    fn captured_label(&self, pattern: &Regex, text: &str) -> Option<String> {
        let captured = pattern.captures(text)?.get(1)?.as_str().trim();
        let party = self.trailing_junk.replace(captured, "");
        let party = party.trim();
        if party.is_empty() {
            None
        } else {
            Some(party.to_string())
        }
    }

    /// 名称候选取最长者, 等长取先出现者
    fn longest_name_candidate(&self, text: &str) -> Option<String> {
        let mut best: Option<&str> = None;
        for m in self.name_candidate.find_iter(text) {
            if best.map(|b| m.as_str().len() > b.len()).unwrap_or(true) {
                best = Some(m.as_str());
            }
        }
        best.map(|s| s.to_string())
    }

    fn clean_description(&self, raw: &str) -> String {
        let collapsed = self.whitespace.replace_all(raw.trim(), " ");
        let no_ellipses = self.ellipses.replace_all(&collapsed, "");
        self.surrounding_symbols
            .replace_all(&no_ellipses, "")
            .to_string()
    }
}

impl Default for InvoiceTextParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_decimal(s: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(s).ok()
}

/// 前n个字符的前缀 (字节安全)
pub(crate) fn prefix_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> InvoiceTextParser {
        InvoiceTextParser::new()
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn parses_pipe_table_rows() {
        let text = "\
INVOICE
DESCRIPTION | QUANTITY | UNIT PRICE | AMOUNT
Ammonium Nitrate | 25,000.000 kg | 45.50 | 1,137,500.00
Urea Prilled | 1,000.000 | 32.250 | 32,250.00

Total: 1,169,750.00
";
        let items = parser().extract_items(text);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "Ammonium Nitrate");
        assert_eq!(items[0].qty, dec("25000.000"));
        assert_eq!(items[0].rate, dec("45.50"));
        assert_eq!(items[1].qty, dec("1000.000"));
        assert_eq!(items[1].rate, dec("32.250"));
    }

    #[test]
    fn pipe_table_stops_at_blank_line() {
        let text = "\
H QUANTITY UNIT PRICE AMOUNT
First Item | 1.000 | 10.00 | 10.00

Second Item | 2.000 | 20.00 | 40.00
";
        let items = parser().extract_items(text);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "First Item");
    }

    #[test]
    fn parses_whitespace_table_rows_without_pipes() {
        let text = "\
DESCRIPTION QUANTITY UNIT PRICE AMOUNT
Ammonium Nitrate 25,000.000 kg 45.500 1,137,500.00
";
        let items = parser().extract_items(text);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Ammonium Nitrate");
        assert_eq!(items[0].qty, dec("25000.000"));
        assert_eq!(items[0].rate, dec("45.500"));
    }

    #[test]
    fn parses_bill_of_charges() {
        let text = "\
BILL OF CHARGES
PARTICULARS           CONSIGNEE   BALANCE
Custom Duties
Import Duty           5,000       2,000
Sales Tax             1,500       0
Zero Fee              0           0
Service Charges       800         0
";
        let items = parser().extract_items(text);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "Import Duty");
        assert_eq!(items[0].qty, dec("1"));
        assert_eq!(items[0].rate, dec("7000"));
        assert_eq!(items[1].description, "Sales Tax");
        assert_eq!(items[1].rate, dec("1500"));
    }

    #[test]
    fn fallback_scans_quantity_lines() {
        let text = "Ammonium Nitrate 25,000.000 kg 45.50 extra\n";
        let items = parser().extract_items(text);
        assert!(!items.is_empty());
        assert_eq!(items[0].description, "Ammonium Nitrate");
        assert_eq!(items[0].qty, dec("25000.000"));
        assert_eq!(items[0].rate, dec("45.50"));
    }

    #[test]
    fn fallback_skips_short_descriptions() {
        let text = "ab 1,000.000 kg 10.00\n";
        let items = parser().extract_items(text);
        assert!(items.iter().all(|i| i.description != "ab"));
    }

    #[test]
    fn keyword_takes_last_token_of_matching_line() {
        let p = parser();
        let text = "\
INVOICE
Invoice No: INV-2025-001
Date: 2025-05-20
Total:   PKR 1200.00
";
        assert_eq!(
            p.extract_keyword(text, &["Invoice#", "Invoice No", "Invoice Number"]),
            Some("INV-2025-001".to_string())
        );
        assert_eq!(p.extract_keyword(text, &["Date"]), Some("2025-05-20".to_string()));
        assert_eq!(
            p.extract_keyword(text, &["Total", "Amount Due"]),
            Some("1200.00".to_string())
        );
        assert_eq!(p.extract_keyword(text, &["Missing Key"]), None);
    }

    #[test]
    fn party_prefers_explicit_partner_field() {
        let text = "Partner Name: Acme Traders.\nInvoice Date: 2025-01-01\n";
        assert_eq!(parser().extract_party(text), Some("Acme Traders".to_string()));
    }

    #[test]
    fn party_falls_back_to_prominent_name() {
        let text = "Global Health Supplies\nInvoice Date: 2025-01-01\nsome body text\n";
        assert_eq!(
            parser().extract_party(text),
            Some("Global Health Supplies".to_string())
        );
    }

    #[test]
    fn party_reads_common_labels() {
        // 顶部无大写名称候选时走标签分支
        let text = "invoice 123\ncustomer: BLUECHEM LTD\n";
        assert_eq!(parser().extract_party(text), Some("BLUECHEM LTD".to_string()));
    }

    #[test]
    fn party_missing_returns_none() {
        assert_eq!(parser().extract_party("no names here 123\n"), None);
    }

    #[test]
    fn normalize_description_strips_non_word() {
        let p = parser();
        assert_eq!(p.normalize_description("Vitamin-D3 [100]"), "vitamind3100");
        assert_eq!(
            p.normalize_description("Vitamin D3, 100"),
            p.normalize_description("vitamin.d3.100")
        );
    }
}
