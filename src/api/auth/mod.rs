/*
 * Responsibility
 * - login / logout の境界
 *   - login: CredentialVerifier で確認 → TokenCodec で発行
 *   - logout: stateless なので server 側で無効化するものはない
 */
pub mod dto;
pub mod handlers;
mod routes;

pub use routes::routes;
