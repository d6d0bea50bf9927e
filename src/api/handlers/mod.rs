/*!
 * Handler implementations for HTTP routes
 */

pub mod unit_handlers;
