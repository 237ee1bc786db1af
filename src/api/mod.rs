pub mod baskets;
pub mod catalog;
pub mod directory;

pub struct ApiUrls {
    pub catalog_service_url: String,
    pub directory_service_url: String,
    pub basket_service_url: String,
}

impl ApiUrls {
    pub fn init() -> Self {
        Self {
            catalog_service_url: Self::get_catalog_service_url(),
            directory_service_url: Self::get_directory_service_url(),
            basket_service_url: Self::get_basket_service_url(),
        }
    }

    pub fn get_catalog_service_url() -> String {
        std::env::var("CATALOG_SERVICE_URL")
            .unwrap_or("http://localhost:3000/catalog-service".to_string())
    }

    pub fn get_directory_service_url() -> String {
        std::env::var("DIRECTORY_SERVICE_URL")
            .unwrap_or("http://localhost:3000/directory-service".to_string())
    }

    pub fn get_basket_service_url() -> String {
        std::env::var("BASKET_SERVICE_URL")
            .unwrap_or("http://localhost:3000/basket-service".to_string())
    }
}
