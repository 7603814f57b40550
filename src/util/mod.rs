/// 頁面 DOM 的查詢
pub mod element;
pub mod map;
pub mod text;
