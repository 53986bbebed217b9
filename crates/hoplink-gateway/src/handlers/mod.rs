mod health;
mod links;
mod redirect;

pub use health::health_handler;
pub use links::{
    create_link_handler, delete_link_handler, link_stats_handler, link_summary_handler,
    list_links_handler, update_link_handler,
};
pub use redirect::redirect_handler;
