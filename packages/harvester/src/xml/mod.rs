//! XML navigation helpers shared by the protocol parser and the normalizers.

mod utils;

pub use utils::{
    element_children, find_all_by_path, find_by_path, find_child, find_children, get_attribute,
    get_tag_name, get_text, has_tag, standalone_fragment, text_at, texts_at,
};
