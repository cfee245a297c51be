use crate::models::{Invoice, InvoiceItem, Item, Party, UploadItem, UploadRecord};
use sqlx::{PgConnection, PgPool};

/// 查询上传单据主表
pub async fn get_upload(
    pool: &PgPool,
    name: &str,
) -> Result<Option<UploadRecord>, sqlx::Error> {
    sqlx::query_as::<_, UploadRecord>(
        r#"
        SELECT name, file, party_type, party, invoice_date, posting_date,
               ocr_status, raw_ocr_text, extracted_data,
               invoice_created, invoice_reference, invoice_type, invoice_status
        FROM invoice_upload
        WHERE name = $1
        "#
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// 更新OCR状态
pub async fn set_ocr_status(
    pool: &PgPool,
    name: &str,
    status: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE invoice_upload SET ocr_status = $2 WHERE name = $1")
        .bind(name)
        .bind(status)
        .execute(pool)
        .await?;
    Ok(())
}

/// 保存OCR原始文本 (供人工复核)
pub async fn save_raw_text(
    pool: &PgPool,
    name: &str,
    text: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE invoice_upload SET raw_ocr_text = $2 WHERE name = $1")
        .bind(name)
        .bind(text)
        .execute(pool)
        .await?;
    Ok(())
}

/// 提取完成: 写入提取结果并置状态为 Extracted
pub async fn finish_extraction(
    pool: &PgPool,
    name: &str,
    extracted_json: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE invoice_upload SET extracted_data = $2, ocr_status = 'Extracted' WHERE name = $1",
    )
    .bind(name)
    .bind(extracted_json)
    .execute(pool)
    .await?;
    Ok(())
}

/// 查询上传单据明细列表
pub async fn list_upload_items(
    pool: &PgPool,
    parent: &str,
) -> Result<Vec<UploadItem>, sqlx::Error> {
    sqlx::query_as::<_, UploadItem>(
        r#"
        SELECT parent, idx, ocr_description, qty, rate, item
        FROM invoice_upload_item
        WHERE parent = $1
        ORDER BY idx
        "#
    )
    .bind(parent)
    .fetch_all(pool)
    .await
}

/// 重写上传单据明细 (先删后插, 重复提取时覆盖旧行)
pub async fn replace_upload_items(
    pool: &PgPool,
    parent: &str,
    items: &[UploadItem],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM invoice_upload_item WHERE parent = $1")
        .bind(parent)
        .execute(pool)
        .await?;

    if items.is_empty() {
        return Ok(());
    }

    tracing::debug!("开始构建明细批量插入语句, {} 条记录", items.len());

    let mut query_builder = sqlx::QueryBuilder::new(
        "INSERT INTO invoice_upload_item (parent, idx, ocr_description, qty, rate, item) "
    );

    query_builder.push_values(items, |mut b, row| {
        b.push_bind(&row.parent)
            .push_bind(row.idx)
            .push_bind(&row.ocr_description)
            .push_bind(row.qty.clone())
            .push_bind(row.rate.clone())
            .push_bind(row.item.clone());
    });

    // 超时控制: 30秒
    let execute_result = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        query_builder.build().execute(pool)
    ).await;

    match execute_result {
        Ok(Ok(result)) => {
            tracing::debug!("明细INSERT成功, 影响 {} 行", result.rows_affected());
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!("明细INSERT失败: {:?}", e);
            Err(e)
        }
        Err(_) => {
            tracing::error!("明细INSERT超时 (>30秒)!");
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

/// 查询启用的商品档案 (供模糊匹配)
pub async fn list_active_items(pool: &PgPool) -> Result<Vec<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>(
        r#"
        SELECT item_code, item_name, description, stock_uom
        FROM item
        WHERE disabled = false
        "#
    )
    .fetch_all(pool)
    .await
}

/// 查询单个商品档案
pub async fn get_item(pool: &PgPool, item_code: &str) -> Result<Option<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>(
        r#"
        SELECT item_code, item_name, description, stock_uom
        FROM item
        WHERE item_code = $1
        "#
    )
    .bind(item_code)
    .fetch_optional(pool)
    .await
}

/// 查询指定类型的往来单位列表
pub async fn list_parties(
    pool: &PgPool,
    party_type: &str,
) -> Result<Vec<Party>, sqlx::Error> {
    sqlx::query_as::<_, Party>(
        r#"
        SELECT name, party_name, party_type
        FROM party
        WHERE party_type = $1
        "#
    )
    .bind(party_type)
    .fetch_all(pool)
    .await
}

/// 往来单位是否存在
pub async fn party_exists(
    pool: &PgPool,
    party_type: &str,
    name: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> =
        sqlx::query_scalar("SELECT 1 FROM party WHERE party_type = $1 AND name = $2")
            .bind(party_type)
            .bind(name)
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}

/// 公司默认费用科目
pub async fn company_default_expense_account(
    pool: &PgPool,
    company: &str,
) -> Result<Option<String>, sqlx::Error> {
    let account: Option<Option<String>> =
        sqlx::query_scalar("SELECT default_expense_account FROM company WHERE name = $1")
            .bind(company)
            .fetch_optional(pool)
            .await?;
    Ok(account.flatten())
}

/// 公司默认收入科目
pub async fn company_default_income_account(
    pool: &PgPool,
    company: &str,
) -> Result<Option<String>, sqlx::Error> {
    let account: Option<Option<String>> =
        sqlx::query_scalar("SELECT default_income_account FROM company WHERE name = $1")
            .bind(company)
            .fetch_optional(pool)
            .await?;
    Ok(account.flatten())
}

/// 兜底科目: 该公司下第一个非汇总的指定类型科目
pub async fn first_leaf_account(
    pool: &PgPool,
    account_type: &str,
    company: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT name
        FROM account
        WHERE account_type = $1
          AND company = $2
          AND is_group = false
        ORDER BY name
        LIMIT 1
        "#
    )
    .bind(account_type)
    .bind(company)
    .fetch_optional(pool)
    .await
}

/// 发票编号: 取序列下一个值拼接前缀
pub async fn next_invoice_name(
    pool: &PgPool,
    sequence: &str,
    prefix: &str,
) -> Result<String, sqlx::Error> {
    let n: i64 = sqlx::query_scalar("SELECT nextval($1::regclass)")
        .bind(sequence)
        .fetch_one(pool)
        .await?;
    Ok(format!("{}-{:05}", prefix, n))
}

/// 插入发票主表 (事务内)
pub async fn insert_invoice(
    conn: &mut PgConnection,
    invoice: &Invoice,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO invoice (
            name, invoice_type, party, bill_no, bill_date,
            posting_date, due_date, status, total
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#
    )
    .bind(&invoice.name)
    .bind(&invoice.invoice_type)
    .bind(&invoice.party)
    .bind(&invoice.bill_no)
    .bind(invoice.bill_date)
    .bind(invoice.posting_date)
    .bind(invoice.due_date)
    .bind(&invoice.status)
    .bind(invoice.total.clone())
    .execute(conn)
    .await?;
    Ok(())
}

/// 批量插入发票明细 (事务内)
pub async fn insert_invoice_items(
    conn: &mut PgConnection,
    items: &[InvoiceItem],
) -> Result<(), sqlx::Error> {
    if items.is_empty() {
        return Ok(());
    }

    let mut query_builder = sqlx::QueryBuilder::new(
        "INSERT INTO invoice_item (
            parent, idx, item_code, item_name, description,
            qty, rate, amount, uom, account
        ) "
    );

    query_builder.push_values(items, |mut b, row| {
        b.push_bind(&row.parent)
            .push_bind(row.idx)
            .push_bind(&row.item_code)
            .push_bind(&row.item_name)
            .push_bind(&row.description)
            .push_bind(row.qty.clone())
            .push_bind(row.rate.clone())
            .push_bind(row.amount.clone())
            .push_bind(&row.uom)
            .push_bind(&row.account);
    });

    query_builder.build().execute(conn).await?;
    Ok(())
}

/// 回写上传单据: 标记发票已创建并记录引用 (事务内)
pub async fn mark_invoice_created(
    conn: &mut PgConnection,
    upload_name: &str,
    party: &str,
    invoice_reference: &str,
    invoice_type: &str,
    invoice_status: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE invoice_upload
        SET invoice_created = true,
            party = $2,
            invoice_reference = $3,
            invoice_type = $4,
            invoice_status = $5
        WHERE name = $1
        "#
    )
    .bind(upload_name)
    .bind(party)
    .bind(invoice_reference)
    .bind(invoice_type)
    .bind(invoice_status)
    .execute(conn)
    .await?;
    Ok(())
}

/// 导出明细复核CSV (内存缓冲, 供HTTP下载)
pub fn export_items_csv(
    items: &[UploadItem],
) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    use csv::Writer;

    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(["idx", "ocr_description", "qty", "rate", "item"])?;

    for row in items {
        writer.write_record(&[
            row.idx.to_string(),
            row.ocr_description.clone(),
            row.qty.to_string(),
            row.rate.to_string(),
            row.item.clone().unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(writer.into_inner()?)
}
