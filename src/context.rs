// ABOUTME: Shared server resources threaded through every route handler
// ABOUTME: Single construction point for store, validator, gateway, and media
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared server resources
//!
//! Everything a request handler needs hangs off one [`ServerResources`]
//! value, cloned into the router state as an `Arc`. Constructing it in one
//! place keeps wiring decisions (cache sizes, media roots) out of handlers.

use std::sync::Arc;

use crate::auth::TokenValidator;
use crate::config::ServerConfig;
use crate::gateway::AccessGateway;
use crate::media::{LocalMediaStore, MediaStore};
use crate::roles::RoleResolver;
use crate::store::Store;

/// Centralized dependency container for all server components
pub struct ServerResources {
    /// Server configuration
    pub config: ServerConfig,
    /// Entity repository
    pub store: Arc<Store>,
    /// Credential validator
    pub validator: Arc<TokenValidator>,
    /// Role resolver
    pub resolver: RoleResolver,
    /// Per-request authorization gateway
    pub gateway: AccessGateway,
    /// Media storage backend
    pub media: Arc<dyn MediaStore>,
}

impl ServerResources {
    /// Assemble resources from configuration and an opened store
    #[must_use]
    pub fn new(config: ServerConfig, store: Arc<Store>) -> Self {
        let validator = Arc::new(TokenValidator::new(
            config.provider_secret.as_bytes(),
            config.token_cache_size,
        ));
        let resolver = RoleResolver::new(Arc::clone(&store));
        let gateway = AccessGateway::new(Arc::clone(&validator), Arc::clone(&store));
        let media: Arc<dyn MediaStore> =
            Arc::new(LocalMediaStore::new(config.media_root.clone()));

        Self {
            config,
            store,
            validator,
            resolver,
            gateway,
            media,
        }
    }
}
