pub mod combine_cats;
pub mod make_mef;
pub mod metadata;
pub mod print_header;
pub mod split_scamp_head;

pub use combine_cats::combine_catalogs;
pub use make_mef::make_mef;
pub use metadata::show_metadata;
pub use print_header::print_fits_header;
pub use split_scamp_head::split_head_file;
