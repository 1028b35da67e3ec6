//! DOM diffing and the change markers it leaves behind.

mod dom_diff;
mod markers;

pub use dom_diff::{
    AttrValue, AttribHandler, DiffResult, DomDiff, decode_comment, emits_sol_transparent_single_line_wt,
    is_block_node, is_block_node_with_visible_wt, is_zero_width_wikitext_elt,
};
pub use markers::{
    add_diff_mark, directly_children_changed, first_non_deleted_child, first_non_sep_child,
    get_diff_mark, has_diff_mark, has_diff_markers, has_inserted_diff_mark, is_content_node,
    is_deleted_block_node, is_diff_marker, last_non_deleted_child, last_non_sep_child,
    maybe_deleted_node, next_non_deleted_sibling, next_non_sep_sibling, nth_non_deleted_child,
    num_non_deleted_child_nodes, only_subtree_changed, prepend_typed_meta,
    previous_non_deleted_sibling, set_diff_mark, subtree_unchanged,
};
