use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::imports::{CreateImportRequest, ImportList, ImportWithDetails},
    entity::{
        book_import_details::{
            ActiveModel as DetailActive, Column as DetailCol, Entity as BookImportDetails,
            Model as DetailModel,
        },
        book_imports::{ActiveModel as ImportActive, Column as ImportCol, Entity as BookImports, Model as ImportModel},
    },
    error::{AppError, AppResult},
    inventory,
    middleware::auth::{AuthUser, ensure_staff},
    models::{BookImport, BookImportDetail},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::stock::{lock_stock, shift_stock},
    state::AppState,
};

/// Record an import receipt and raise stock, or reject the whole batch.
pub async fn import_books(
    state: &AppState,
    user: &AuthUser,
    payload: CreateImportRequest,
) -> AppResult<ApiResponse<ImportWithDetails>> {
    ensure_staff(user)?;
    let txn = state.orm.begin().await?;

    let stock = lock_stock(&txn, &payload.lines).await?;
    let accepted = match inventory::validate_import(&payload.lines, &stock) {
        Ok(lines) => lines,
        Err(err) => {
            tracing::info!(staff_id = %user.user_id, reason = %err, "import rejected");
            return Err(err.into());
        }
    };

    let total_quantity: i32 = accepted.iter().map(|l| l.quantity).sum();
    let receipt = ImportActive {
        id: Set(Uuid::new_v4()),
        staff_id: Set(user.user_id),
        import_date: NotSet,
        total_quantity: Set(total_quantity),
        notes: Set(payload.notes.filter(|n| !n.trim().is_empty())),
    }
    .insert(&txn)
    .await?;

    let mut details = Vec::with_capacity(accepted.len());
    for line in &accepted {
        let detail = DetailActive {
            id: Set(Uuid::new_v4()),
            import_id: Set(receipt.id),
            book_id: Set(line.book_id),
            quantity: Set(line.quantity),
        }
        .insert(&txn)
        .await?;
        details.push(detail_from_entity(detail));

        shift_stock(&txn, line.book_id, line.quantity).await?;
    }

    txn.commit().await?;

    tracing::info!(
        import_id = %receipt.id,
        staff_id = %user.user_id,
        total_quantity,
        lines = details.len(),
        "import recorded"
    );

    audit::record(
        &state.pool,
        Some(user.user_id),
        "book_import",
        "book_imports",
        serde_json::json!({ "import_id": receipt.id, "total_quantity": total_quantity }),
    )
    .await;

    Ok(ApiResponse::single(
        "Import recorded",
        ImportWithDetails {
            receipt: import_from_entity(receipt),
            details,
        },
    ))
}

pub async fn list_imports(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ImportList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = pagination.normalize(state.page_size);

    let finder = BookImports::find().order_by_desc(ImportCol::ImportDate);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(import_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Imports", ImportList { items }, Some(meta)))
}

pub async fn get_import(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ImportWithDetails>> {
    ensure_staff(user)?;
    let receipt = BookImports::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let details = BookImportDetails::find()
        .filter(DetailCol::ImportId.eq(receipt.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(detail_from_entity)
        .collect();

    Ok(ApiResponse::single(
        "Import found",
        ImportWithDetails {
            receipt: import_from_entity(receipt),
            details,
        },
    ))
}

fn import_from_entity(model: ImportModel) -> BookImport {
    BookImport {
        id: model.id,
        staff_id: model.staff_id,
        import_date: model.import_date.with_timezone(&Utc),
        total_quantity: model.total_quantity,
        notes: model.notes,
    }
}

fn detail_from_entity(model: DetailModel) -> BookImportDetail {
    BookImportDetail {
        id: model.id,
        import_id: model.import_id,
        book_id: model.book_id,
        quantity: model.quantity,
    }
}
