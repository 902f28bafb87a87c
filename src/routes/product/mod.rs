mod handler;
mod model;

pub use handler::{
    create_product, delete_product, find_by_id, find_by_seller, find_featured, list_products,
    my_products, seller_rating, update_product,
};
pub use model::{Product, ProductForm, ProductImage, ProductPage, Review, SortBy};
