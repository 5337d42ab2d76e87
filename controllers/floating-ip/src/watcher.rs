//! Kubernetes resource watchers.
//!
//! This module handles watching FloatingIP resources for changes and
//! triggering reconciliation using kube_runtime::Controller.
//!
//! The watcher uses a generic `watch_resource()` helper that properly
//! handles the reconcile loop with automatic reconnection and retry logic.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::{
    controller::{Action, Config as ControllerConfig},
    watcher, Controller,
};
use tracing::{debug, error, info};

use crds::FloatingIP;

use crate::error::ControllerError;
use crate::reconciler::Reconciler;

/// Generic watcher helper built on kube_runtime::Controller.
///
/// The Controller handles automatic reconnection, coalesces duplicate
/// events per resource key, and guarantees that no two reconciles for the
/// same key ever run concurrently. Failed reconciles are requeued by the
/// error policy using the reconciler's per-resource backoff state.
async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &str,
) -> Result<(), ControllerError>
where
    K: kube::Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Action, ControllerError>> + Send>> + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    // Error policy: requeue with the per-resource exponential backoff
    let error_policy = |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = obj.name_any();
        let (backoff_secs, error_count) = ctx.get_backoff_for_resource(&key);
        error!(
            "Reconciliation error for {} {} (attempt {}), requeueing in {}s: {}",
            resource_name, key, error_count, backoff_secs, error
        );
        Action::requeue(Duration::from_secs(backoff_secs))
    };

    // Reconcile function: wraps the reconciler call with debug logging so
    // excessive reconciliations are diagnosable
    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        let resource_name = resource_name.to_string();
        async move {
            debug!("Reconciling {} {:?}", resource_name, obj);

            match reconcile_fn(ctx, obj).await {
                Ok(action) => Ok(action),
                Err(e) => {
                    error!("Reconciliation failed for {}: {}", resource_name, e);
                    Err(e)
                }
            }
        }
    };

    // Debounce batches rapid spec/status update bursts into one reconcile;
    // concurrency bounds the worker pool across distinct resource keys.
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(1))
        .concurrency(3);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Controller error for {}: {}", resource_name, e);
            }
        })
        .await;

    Ok(())
}

/// Watches FloatingIP resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    floating_ip_api: Api<FloatingIP>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, floating_ip_api: Api<FloatingIP>) -> Self {
        Self {
            reconciler,
            floating_ip_api,
        }
    }

    /// Starts watching FloatingIP resources.
    pub async fn watch_floating_ips(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.floating_ip_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| {
                Box::pin(async move { reconciler.reconcile_floating_ip(&resource).await })
            },
            "FloatingIP",
        )
        .await
    }
}
