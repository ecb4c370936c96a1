use bookstore_api::{
    config::AppConfig,
    db::{DbPool, create_orm_conn, raw_pool, run_migrations},
    models::UserRole,
    services::auth_service::hash_password,
};
use uuid::Uuid;

const CATEGORIES: [&str; 4] = ["Văn học", "Kỹ năng sống", "Kinh tế", "Thiếu nhi"];

struct SeedBook {
    title: &'static str,
    author: &'static str,
    image: Option<&'static str>,
    category: &'static str,
    quantity_in_stock: i32,
    price: i64,
}

const BOOKS: [SeedBook; 4] = [
    SeedBook {
        title: "Nhà Giả Kim",
        author: "Paulo Coelho",
        image: Some("https://res.cloudinary.com/dehkjrhjw/image/upload/v1732361940/nhagiakim_cnfihh.jpg"),
        category: "Văn học",
        quantity_in_stock: 50,
        price: 88000,
    },
    SeedBook {
        title: "Đắc Nhân Tâm",
        author: "Dale Carnegie",
        image: None,
        category: "Kỹ năng sống",
        quantity_in_stock: 100,
        price: 76000,
    },
    SeedBook {
        title: "Think and Grow Rich",
        author: "Napoleon Hill",
        image: None,
        category: "Kinh tế",
        quantity_in_stock: 75,
        price: 120000,
    },
    SeedBook {
        title: "Doraemon Tập 1",
        author: "Fujiko F. Fujio",
        image: None,
        category: "Thiếu nhi",
        quantity_in_stock: 150,
        price: 25000,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bookstore_api=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;
    let pool = raw_pool(&orm);

    let admin_id = ensure_user(&pool, "admin", "123456", UserRole::Admin).await?;
    let staff_id = ensure_user(&pool, "staff", "123456", UserRole::Staff).await?;
    seed_categories(&pool).await?;
    seed_books(&pool).await?;

    tracing::info!(%admin_id, %staff_id, "seed completed");
    Ok(())
}

async fn ensure_user(
    pool: &DbPool,
    username: &str,
    password: &str,
    role: UserRole,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, username, password_hash, role)
        VALUES ($1, $2, $2, $3, $4)
        ON CONFLICT (username) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE username = $1")
                .bind(username)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    tracing::info!(username, role = %role, "ensured user");
    Ok(user_id)
}

async fn seed_categories(pool: &DbPool) -> anyhow::Result<()> {
    for name in CATEGORIES {
        sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(Uuid::new_v4())
            .bind(name)
            .execute(pool)
            .await?;
    }
    tracing::info!(count = CATEGORIES.len(), "seeded categories");
    Ok(())
}

async fn seed_books(pool: &DbPool) -> anyhow::Result<()> {
    for book in &BOOKS {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, image, category_id, quantity_in_stock, price)
            SELECT $1, $2, $3, $4, c.id, $6, $7
            FROM categories c
            WHERE c.name = $5
            ON CONFLICT (title, author) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(book.title)
        .bind(book.author)
        .bind(book.image)
        .bind(book.category)
        .bind(book.quantity_in_stock)
        .bind(book.price)
        .execute(pool)
        .await?;
    }
    tracing::info!(count = BOOKS.len(), "seeded books");
    Ok(())
}
