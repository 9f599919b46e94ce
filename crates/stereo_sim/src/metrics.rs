use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use stereo_core::{AutoStereoState, GrabChange, TickReport};

pub struct SimMetrics {
    pub registry: Registry,
    pub frames_total: IntCounter,
    pub frame_errors_total: IntCounter,
    pub tracker_events_total: IntCounterVec,
    pub transitions_total: IntCounter,
    pub stale_transforms: IntGauge,
    pub auto_stereo_state: IntGauge,
    pub ipd: Gauge,
    pub head_visible: IntGauge,
    pub grabs_total: IntCounterVec,
}

impl SimMetrics {
    pub fn new(session_id: &str) -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("stereo_sim".into()), None)?;
        let opts =
            |name: &str, help: &str| Opts::new(name, help).const_label("session_id", session_id);

        let frames_total =
            IntCounter::with_opts(opts("frames_total", "Frames ticked successfully"))?;
        let frame_errors_total = IntCounter::with_opts(opts(
            "frame_errors_total",
            "Frames abandoned on an invalid reference",
        ))?;
        let tracker_events_total =
            IntCounterVec::new(opts("tracker_events_total", "Tracker events by kind"), &["kind"])?;
        let transitions_total = IntCounter::with_opts(opts(
            "auto_stereo_transitions_total",
            "Auto-stereo state changes",
        ))?;
        let stale_transforms = IntGauge::with_opts(opts(
            "stale_transforms",
            "Cached transforms left over from earlier frames",
        ))?;
        let auto_stereo_state = IntGauge::with_opts(opts(
            "auto_stereo_state",
            "0 = idle mono, 1 = idle stereo, 2 = animating",
        ))?;
        let ipd = Gauge::with_opts(opts(
            "frustum_ipd_meters",
            "Eye separation handed to the frustum",
        ))?;
        let head_visible =
            IntGauge::with_opts(opts("head_visible", "Whether the head is tracked"))?;
        let grabs_total = IntCounterVec::new(
            opts("stylus_grabs_total", "Stylus grabs started, by scope"),
            &["scope"],
        )?;

        registry.register(Box::new(frames_total.clone()))?;
        registry.register(Box::new(frame_errors_total.clone()))?;
        registry.register(Box::new(tracker_events_total.clone()))?;
        registry.register(Box::new(transitions_total.clone()))?;
        registry.register(Box::new(stale_transforms.clone()))?;
        registry.register(Box::new(auto_stereo_state.clone()))?;
        registry.register(Box::new(ipd.clone()))?;
        registry.register(Box::new(head_visible.clone()))?;
        registry.register(Box::new(grabs_total.clone()))?;

        Ok(Self {
            registry,
            frames_total,
            frame_errors_total,
            tracker_events_total,
            transitions_total,
            stale_transforms,
            auto_stereo_state,
            ipd,
            head_visible,
            grabs_total,
        })
    }

    pub fn router(&self) -> Router {
        let reg = self.registry.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let reg = reg.clone();
                async move {
                    let mut buf = Vec::new();
                    if let Err(e) = TextEncoder::new().encode(&reg.gather(), &mut buf) {
                        tracing::error!(error = %e, "Failed to encode metrics");
                        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                    }
                    match String::from_utf8(buf) {
                        Ok(body) => body.into_response(),
                        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
                    }
                }
            }),
        )
    }

    pub fn record_tick(
        &self,
        report: &TickReport,
        state: AutoStereoState,
        ipd: f32,
        head_visible: bool,
    ) {
        self.frames_total.inc();
        self.stale_transforms.set(report.stale_transforms as i64);
        for event in &report.events {
            self.tracker_events_total.with_label_values(&[event.kind()]).inc();
        }
        if report.transition.is_some() {
            self.transitions_total.inc();
        }
        self.auto_stereo_state.set(match state {
            AutoStereoState::IdleMono => 0,
            AutoStereoState::IdleStereo => 1,
            AutoStereoState::Animating => 2,
        });
        self.ipd.set(ipd as f64);
        self.head_visible.set(head_visible as i64);
    }

    pub fn record_grab<Id>(&self, change: &GrabChange<Id>) {
        if let GrabChange::Began { whole_object, .. } = change {
            let scope = if *whole_object { "object" } else { "part" };
            self.grabs_total.with_label_values(&[scope]).inc();
        }
    }
}
