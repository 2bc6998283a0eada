use uuid::Uuid;

use crate::db::{get_n, get_opt_n, get_s, n, s, Db, DbError, Item};
use crate::documents::specs::DocumentType;

pub const REGISTRATION_INDEX: &str = "RegistrationIndex";

#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub registration_id: String,
    pub document_type: DocumentType,
    pub s3_key: String,
    pub file_size: i64,
    pub file_type: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub uploaded_at: i64,
}

pub fn document_to_item(record: &DocumentRecord) -> Item {
    let mut item = Item::new();
    item.insert("id".into(), s(record.id.to_string()));
    item.insert("userId".into(), s(record.user_id.to_string()));
    item.insert("registrationId".into(), s(&record.registration_id));
    item.insert("documentType".into(), s(record.document_type.as_str()));
    item.insert("s3Key".into(), s(&record.s3_key));
    item.insert("fileSize".into(), n(record.file_size));
    item.insert("fileType".into(), s(&record.file_type));
    if let Some(width) = record.width {
        item.insert("width".into(), n(width));
    }
    if let Some(height) = record.height {
        item.insert("height".into(), n(height));
    }
    item.insert("uploadedAt".into(), n(record.uploaded_at));
    item
}

fn parse_doc_type(raw: &str) -> Result<DocumentType, DbError> {
    match raw {
        "photo" => Ok(DocumentType::Photo),
        "signature" => Ok(DocumentType::Signature),
        "id_proof" => Ok(DocumentType::IdProof),
        other => Err(DbError::Malformed(format!("unknown document type: {other}"))),
    }
}

pub fn item_to_document(item: &Item) -> Result<DocumentRecord, DbError> {
    let id = get_s(item, "id")?
        .parse::<Uuid>()
        .map_err(|e| DbError::Malformed(format!("document id is not a uuid: {e}")))?;
    let user_id = get_s(item, "userId")?
        .parse::<Uuid>()
        .map_err(|e| DbError::Malformed(format!("document userId is not a uuid: {e}")))?;
    Ok(DocumentRecord {
        id,
        user_id,
        registration_id: get_s(item, "registrationId")?,
        document_type: parse_doc_type(&get_s(item, "documentType")?)?,
        s3_key: get_s(item, "s3Key")?,
        file_size: get_n(item, "fileSize")?,
        file_type: get_s(item, "fileType")?,
        width: get_opt_n(item, "width"),
        height: get_opt_n(item, "height"),
        uploaded_at: get_n(item, "uploadedAt")?,
    })
}

pub async fn create(db: &Db, record: &DocumentRecord) -> Result<(), DbError> {
    db.client
        .put_item()
        .table_name(&db.tables.documents)
        .set_item(Some(document_to_item(record)))
        .condition_expression("attribute_not_exists(id)")
        .send()
        .await
        .map_err(crate::db::put_err)?;
    Ok(())
}

pub async fn find_by_id(db: &Db, id: Uuid) -> Result<Option<DocumentRecord>, DbError> {
    let result = db
        .client
        .get_item()
        .table_name(&db.tables.documents)
        .key("id", s(id.to_string()))
        .send()
        .await
        .map_err(|e| DbError::Other(anyhow::Error::new(e.into_service_error())))?;
    match result.item {
        Some(item) => Ok(Some(item_to_document(&item)?)),
        None => Ok(None),
    }
}

pub async fn list_by_registration(
    db: &Db,
    registration_id: &str,
) -> Result<Vec<DocumentRecord>, DbError> {
    let result = db
        .client
        .query()
        .table_name(&db.tables.documents)
        .index_name(REGISTRATION_INDEX)
        .key_condition_expression("registrationId = :rid")
        .expression_attribute_values(":rid", s(registration_id))
        .send()
        .await
        .map_err(|e| DbError::Other(anyhow::Error::new(e.into_service_error())))?;
    result
        .items
        .unwrap_or_default()
        .iter()
        .map(item_to_document)
        .collect()
}

pub async fn delete(db: &Db, id: Uuid) -> Result<(), DbError> {
    db.client
        .delete_item()
        .table_name(&db.tables.documents)
        .key("id", s(id.to_string()))
        .send()
        .await
        .map_err(|e| DbError::Other(anyhow::Error::new(e.into_service_error())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_roundtrip_with_dimensions() {
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            registration_id: "reg-42".into(),
            document_type: DocumentType::Photo,
            s3_key: "documents/u/photo/x.jpg".into(),
            file_size: 40_000,
            file_type: "image/jpeg".into(),
            width: Some(350),
            height: Some(450),
            uploaded_at: 1_800_000_000,
        };
        let back = item_to_document(&document_to_item(&record)).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.document_type, DocumentType::Photo);
        assert_eq!(back.width, Some(350));
    }

    #[test]
    fn item_roundtrip_without_dimensions() {
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            registration_id: "reg-42".into(),
            document_type: DocumentType::IdProof,
            s3_key: "documents/u/id_proof/x.pdf".into(),
            file_size: 120_000,
            file_type: "application/pdf".into(),
            width: None,
            height: None,
            uploaded_at: 1_800_000_000,
        };
        let back = item_to_document(&document_to_item(&record)).unwrap();
        assert_eq!(back.width, None);
        assert_eq!(back.document_type, DocumentType::IdProof);
    }
}
