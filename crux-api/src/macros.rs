//! Utility macros

/// Implement `FromRef<AppState>` so handlers can extract one field as state.
///
/// ```ignore
/// impl_from_ref!(SharedStore, store);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for SharedStore {
///     fn from_ref(state: &AppState) -> Self {
///         state.store.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
