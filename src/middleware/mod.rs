/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth (gate), cors, http (request id / trace / timeout / body limit)
 */
pub mod auth;
pub mod cors;
pub mod http;
