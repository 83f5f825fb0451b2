/*
 * Responsibility
 * - HTTP surface: /auth (login/logout), /api/v1, extractors
 */
pub mod auth;
pub mod extractors;
pub mod v1;
