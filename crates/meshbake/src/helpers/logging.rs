#[cfg(feature = "profile-tracy")]
pub fn init_profiling() {
    use tracing_subscriber::{layer::SubscriberExt, Registry};
    let tracy_layer = tracing_tracy::TracyLayer::default();
    let subscriber = Registry::default().with(tracy_layer);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        log::warn!("Tracing subscriber already installed, tracy layer not attached");
        return;
    }

    tracy_client::set_thread_name!("meshbake-main");
    // first frame boundary so the timeline starts immediately
    tracy_client::frame_mark();
}

#[cfg(not(feature = "profile-tracy"))]
pub fn init_profiling() {}

/// Marks the end of a rendered frame on the profiler timeline.
#[inline]
pub fn frame_mark() {
    #[cfg(feature = "profile-tracy")]
    tracy_client::frame_mark();
}
