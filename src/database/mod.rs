use mongodb::{Client, Collection, Database};
use std::error::Error;

pub const PRODUCTS: &str = "products";
pub const USERS: &str = "users";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Lookup indexes. users(email) is not unique: signup pre-checks instead.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<mongodb::bson::Document>(USERS);
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .build();

        match users.create_index(email_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(email)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let products = self.collection::<mongodb::bson::Document>(PRODUCTS);
        let name_index = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .build();

        match products.create_index(name_index).await {
            Ok(_) => log::info!("   ✅ Index created: products(name)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub async fn ping(&self) -> bool {
        self.db
            .run_command(mongodb::bson::doc! { "ping": 1 })
            .await
            .is_ok()
    }
}
