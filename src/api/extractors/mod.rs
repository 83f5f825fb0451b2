/*!
 * Request extractors
 *
 * Public API:
 * - PrincipalExtractor
 */

mod principal;

pub use principal::PrincipalExtractor;
