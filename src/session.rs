use crate::config::{DeviceConfig, ABSOLUTE_MAX_TOUCHES};
use crate::contact::ObjectType;
use crate::cover::CoverToggle;
use crate::error::{Error, Result};
use crate::glove::{GloveClassifier, TouchTypeState};
use crate::report::{Frame, ReportAssembler, SlotMemory};
use crate::sink::InputSink;
use crate::transport::{DeviceControl, Mode, Transport};
use std::sync::{Mutex, MutexGuard, PoisonError};

const NUM_TOUCHES_MASK: u8 = 0x1F;
const BAD_PACKET: u8 = 0x20;
const LARGE_AREA: u8 = 0x20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Contacts went through the assembler.
    Reported(Frame),
    /// No contacts this cycle; `released` tells whether anything was down.
    LiftedOff { released: bool },
    /// The controller flagged the packet as bad.
    Malformed,
    Suspended,
}

#[derive(Debug, Clone)]
pub struct Session {
    config: DeviceConfig,
    classifier: GloveClassifier,
    memory: SlotMemory,
    cover: CoverToggle,
    suspended: bool,
}

impl Session {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            classifier: GloveClassifier::new(),
            memory: SlotMemory::default(),
            cover: CoverToggle::new(),
            suspended: false,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn classifier(&self) -> &GloveClassifier {
        &self.classifier
    }

    pub fn classifier_mut(&mut self) -> &mut GloveClassifier {
        &mut self.classifier
    }

    pub fn memory(&self) -> SlotMemory {
        self.memory
    }

    pub fn cover(&self) -> &CoverToggle {
        &self.cover
    }

    pub fn surface_covered(&self) -> bool {
        self.cover.is_covered()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Handle one attention interrupt: read the report, gate it, emit.
    pub fn attention<T, S>(&mut self, transport: &mut T, sink: &mut S) -> Result<CycleOutcome>
    where
        T: Transport + ?Sized,
        S: InputSink + ?Sized,
    {
        if self.suspended {
            tracing::debug!("attention while suspended, ignored");
            return Ok(CycleOutcome::Suspended);
        }

        let si = &self.config.sysinfo;
        let header = transport.read(Mode::Operational, 0, si.records_ofs())?;
        let reg = |ofs: usize| header.get(ofs).copied().unwrap_or(0);
        let rep_len = reg(si.rep_ofs);
        let rep_stat = reg(si.rep_ofs + 1);
        let tt_stat = reg(si.tt_stat_ofs);

        let mut count = usize::from(tt_stat & NUM_TOUCHES_MASK);
        if rep_len == 0 && count > 0 {
            tracing::error!(rep_len, num_cur_tch = count, "report length error");
            return Err(Error::ReportLength { count });
        }

        let records = if count > 0 {
            transport.read(Mode::Operational, si.records_ofs(), count * si.record_size)?
        } else {
            Vec::new()
        };

        if rep_stat & BAD_PACKET != 0 {
            tracing::debug!(rep_stat, "invalid buffer detected");
            return Ok(CycleOutcome::Malformed);
        }

        if tt_stat & LARGE_AREA != 0 {
            tracing::debug!("large area detected");
            if !self.config.orientation.report_on_large_area {
                count = 0;
            }
        }

        if count > si.max_touches {
            if count > ABSOLUTE_MAX_TOUCHES {
                tracing::error!(
                    num_cur_tch = count,
                    max = ABSOLUTE_MAX_TOUCHES,
                    "extreme touch count, treated as none"
                );
                count = 0;
            } else {
                tracing::error!(num_cur_tch = count, max = si.max_touches, "too many touches");
                count = si.max_touches;
            }
        }

        if count == 0 {
            let released = self.lift_all(sink);
            return Ok(CycleOutcome::LiftedOff { released });
        }

        let covered = self.cover.is_covered();
        let frame = ReportAssembler::new(&self.config).assemble(
            &records,
            count,
            &mut self.classifier,
            covered,
            &mut self.memory,
            sink,
        );
        Ok(CycleOutcome::Reported(frame))
    }

    /// Release every slot if anything was down last cycle.
    pub fn lift_all<S: InputSink + ?Sized>(&mut self, sink: &mut S) -> bool {
        if self.memory.previous_contact_count == 0 {
            return false;
        }
        sink.release_all();
        if self.memory.previous_object_type != ObjectType::Hover {
            sink.report_touch_key(false);
        }
        sink.sync();
        self.memory.previous_contact_count = 0;
        true
    }

    pub fn startup<S: InputSink + ?Sized>(&mut self, sink: &mut S) {
        self.lift_all(sink);
        self.classifier.set_state(TouchTypeState::GloveBelieved);
        tracing::info!("startup, glove believed");
    }

    pub fn suspend<S: InputSink + ?Sized>(&mut self, sink: &mut S) {
        self.suspended = true;
        self.lift_all(sink);
        tracing::debug!("suspended");
    }

    pub fn resume(&mut self) {
        self.suspended = false;
        tracing::debug!("resumed");
    }

    pub fn store_cover<C: DeviceControl + ?Sized>(&mut self, ctl: &mut C, text: &str) -> Result<usize> {
        self.cover.store(ctl, text)
    }
}

struct DriverInner<T, S> {
    session: Session,
    transport: T,
    sink: S,
}

/// A session with its transport and sink behind one lock. Every cycle,
/// lifecycle transition and cover write holds the lock for its whole run.
pub struct Driver<T, S> {
    inner: Mutex<DriverInner<T, S>>,
}

impl<T, S> Driver<T, S>
where
    T: Transport + DeviceControl,
    S: InputSink,
{
    pub fn new(config: DeviceConfig, transport: T, sink: S) -> Self {
        Self {
            inner: Mutex::new(DriverInner {
                session: Session::new(config),
                transport,
                sink,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DriverInner<T, S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn attention(&self) -> Result<CycleOutcome> {
        let mut guard = self.lock();
        let DriverInner {
            session,
            transport,
            sink,
        } = &mut *guard;
        session.attention(transport, sink)
    }

    pub fn startup(&self) {
        let mut guard = self.lock();
        let DriverInner { session, sink, .. } = &mut *guard;
        session.startup(sink);
    }

    pub fn suspend(&self) {
        let mut guard = self.lock();
        let DriverInner { session, sink, .. } = &mut *guard;
        session.suspend(sink);
    }

    pub fn resume(&self) {
        self.lock().session.resume();
    }

    pub fn show_cover(&self) -> String {
        self.lock().session.cover().show()
    }

    pub fn store_cover(&self, text: &str) -> Result<usize> {
        let mut guard = self.lock();
        let DriverInner {
            session, transport, ..
        } = &mut *guard;
        session.store_cover(transport, text)
    }

    /// Run `f` with every part borrowed under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut Session, &mut T, &mut S) -> R) -> R {
        let mut guard = self.lock();
        let DriverInner {
            session,
            transport,
            sink,
        } = &mut *guard;
        f(session, transport, sink)
    }

    pub fn into_parts(self) -> (Session, T, S) {
        let inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        (inner.session, inner.transport, inner.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::{ContactRecord, EventType};
    use crate::sink::recorder::{ContactView, EventRecorder, SinkEvent};
    use crate::sink::{AbsAxis, SlotBitmap};
    use crate::testutil::{finger, hover, packet};
    use crate::transport::snapshot::SnapshotTransport;
    use crate::transport::TransportError;

    struct Rig {
        session: Session,
        transport: SnapshotTransport,
        sink: EventRecorder,
    }

    impl Rig {
        fn new() -> Self {
            Self::with_config(DeviceConfig::tma4xx())
        }

        fn with_config(config: DeviceConfig) -> Self {
            Self {
                session: Session::new(config),
                transport: SnapshotTransport::new(),
                sink: EventRecorder::new(),
            }
        }

        fn feed(&mut self, data: Vec<u8>) -> Result<CycleOutcome> {
            self.transport.load(data);
            self.session.attention(&mut self.transport, &mut self.sink)
        }

        fn touch(&mut self, contacts: &[ContactRecord]) -> CycleOutcome {
            let data = packet(&self.session.config().sysinfo, 0, 0, contacts);
            self.feed(data).unwrap()
        }
    }

    #[test]
    fn test_single_finger_end_to_end() {
        let mut rig = Rig::new();
        let outcome = rig.touch(&[finger(2, 500, 300, 40)]);

        let CycleOutcome::Reported(frame) = outcome else {
            panic!("expected a report");
        };
        assert_eq!(frame.synced, 1);
        assert!(frame.pressed);
        assert_eq!(frame.active.iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(rig.sink.events[0], SinkEvent::TouchKey(true));
        assert_eq!(rig.sink.events[1], SinkEvent::Slot(2));
        assert_eq!(rig.sink.events[2], SinkEvent::Abs(AbsAxis::PositionX, 500));
        assert_eq!(rig.sink.events[3], SinkEvent::Abs(AbsAxis::PositionY, 300));
        assert_eq!(rig.sink.events[4], SinkEvent::Abs(AbsAxis::Pressure, 40));
        assert_eq!(rig.session.memory().previous_contact_count, 1);
        assert_eq!(
            rig.session.classifier().state(),
            TouchTypeState::FingerBelieved
        );
    }

    #[test]
    fn test_empty_report_lifts_off_once() {
        let mut rig = Rig::new();
        rig.touch(&[finger(1, 10, 10, 5)]);
        rig.sink.take();

        assert_eq!(rig.touch(&[]), CycleOutcome::LiftedOff { released: true });
        assert_eq!(
            rig.sink.take(),
            vec![SinkEvent::ReleaseAll, SinkEvent::TouchKey(false), SinkEvent::Sync]
        );
        assert_eq!(rig.session.memory().previous_contact_count, 0);

        assert_eq!(rig.touch(&[]), CycleOutcome::LiftedOff { released: false });
        assert!(rig.sink.events.is_empty());
    }

    #[test]
    fn test_lift_after_hover_skips_release_edge() {
        let mut rig = Rig::new();
        rig.touch(&[hover(1, EventType::TouchDown, 10, 10)]);
        rig.sink.take();

        rig.touch(&[]);
        assert_eq!(rig.sink.take(), vec![SinkEvent::ReleaseAll, SinkEvent::Sync]);
    }

    #[test]
    fn test_report_length_error_leaves_state() {
        let mut rig = Rig::new();
        let si = rig.session.config().sysinfo;
        let mut data = packet(&si, 0, 0, &[finger(1, 10, 10, 5)]);
        data[si.rep_ofs] = 0;

        let err = rig.feed(data).unwrap_err();
        assert!(matches!(err, Error::ReportLength { count: 1 }));
        assert!(rig.sink.events.is_empty());
        assert_eq!(rig.session.memory(), SlotMemory::default());
    }

    /// A finger plus a tracked hover, so memory and the glove pool both hold
    /// something a failed cycle could disturb.
    fn rig_with_state() -> Rig {
        let mut rig = Rig::new();
        rig.touch(&[finger(1, 10, 10, 5), hover(2, EventType::TouchDown, 50, 50)]);
        rig.sink.take();
        assert_eq!(rig.session.classifier().slots()[0].candidate, Some(2));
        rig
    }

    fn assert_state_kept(rig: &Rig) {
        assert!(rig.sink.events.is_empty());
        assert_eq!(
            rig.session.memory(),
            SlotMemory {
                previous_contact_count: 2,
                previous_object_type: ObjectType::Hover,
            }
        );
        assert_eq!(
            rig.session.classifier().state(),
            TouchTypeState::FingerBelieved
        );
        let slots = rig.session.classifier().slots();
        assert_eq!(slots[0].candidate, Some(2));
        assert_eq!((slots[0].anchor_x, slots[0].anchor_y), (50, 50));
        assert!(slots[1..].iter().all(|s| s.candidate.is_none()));
    }

    #[test]
    fn test_short_record_read_propagates() {
        let mut rig = rig_with_state();
        let si = rig.session.config().sysinfo;
        let mut data = packet(&si, 0, 0, &[hover(2, EventType::Move, 50, 400)]);
        data.truncate(si.records_ofs() + 3);

        let err = rig.feed(data).unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::ShortRead { .. })
        ));
        assert_state_kept(&rig);
    }

    #[test]
    fn test_failed_header_read_propagates() {
        let mut rig = rig_with_state();
        rig.transport = SnapshotTransport::new();

        let err = rig
            .session
            .attention(&mut rig.transport, &mut rig.sink)
            .unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::NoData)));
        assert_state_kept(&rig);
    }

    #[test]
    fn test_omitted_contact_above_family_count_is_released() {
        let mut rig = Rig::new();
        rig.touch(&[finger(12, 600, 700, 20)]);
        rig.touch(&[finger(1, 10, 10, 5)]);

        let mut view = ContactView::new();
        for event in &rig.sink.events {
            view.process(event);
        }
        assert_eq!(view.active().map(|(slot, _)| slot).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_bad_packet_is_silent() {
        let mut rig = Rig::new();
        let si = rig.session.config().sysinfo;
        let data = packet(&si, BAD_PACKET, 0, &[finger(1, 10, 10, 5)]);
        assert_eq!(rig.feed(data).unwrap(), CycleOutcome::Malformed);
        assert!(rig.sink.events.is_empty());
        assert_eq!(rig.session.memory(), SlotMemory::default());
    }

    #[test]
    fn test_large_area_drops_contacts() {
        let mut rig = Rig::new();
        rig.touch(&[finger(1, 10, 10, 5)]);
        rig.sink.take();

        let si = rig.session.config().sysinfo;
        let data = packet(&si, 0, LARGE_AREA, &[finger(1, 10, 10, 5)]);
        assert_eq!(
            rig.feed(data).unwrap(),
            CycleOutcome::LiftedOff { released: true }
        );
    }

    #[test]
    fn test_large_area_reported_when_configured() {
        let mut config = DeviceConfig::tma4xx();
        config.orientation.report_on_large_area = true;
        let mut rig = Rig::with_config(config);
        let si = rig.session.config().sysinfo;
        let data = packet(&si, 0, LARGE_AREA, &[finger(1, 10, 10, 5)]);
        assert!(matches!(rig.feed(data).unwrap(), CycleOutcome::Reported(_)));
    }

    #[test]
    fn test_count_clamped_to_family_max() {
        let mut rig = Rig::new();
        let contacts: Vec<_> = (0..12).map(|id| finger(id, 10, 10, 5)).collect();
        let CycleOutcome::Reported(frame) = rig.touch(&contacts) else {
            panic!("expected a report");
        };
        assert_eq!(frame.synced, 10);
        assert_eq!(rig.session.memory().previous_contact_count, 10);
    }

    #[test]
    fn test_extreme_count_treated_as_none() {
        let mut rig = Rig::new();
        let contacts: Vec<_> = (0..15).map(|id| finger(id % 8, 10, 10, 5)).collect();
        assert_eq!(
            rig.touch(&contacts),
            CycleOutcome::LiftedOff { released: false }
        );
        assert!(rig.sink.events.is_empty());
    }

    #[test]
    fn test_startup_resets_belief_and_releases() {
        let mut rig = Rig::new();
        rig.touch(&[finger(1, 10, 10, 5)]);
        rig.sink.take();

        rig.session.startup(&mut rig.sink);
        assert_eq!(
            rig.session.classifier().state(),
            TouchTypeState::GloveBelieved
        );
        assert_eq!(
            rig.sink.take(),
            vec![SinkEvent::ReleaseAll, SinkEvent::TouchKey(false), SinkEvent::Sync]
        );

        rig.session.startup(&mut rig.sink);
        assert!(rig.sink.events.is_empty());
        assert_eq!(
            rig.session.classifier().state(),
            TouchTypeState::GloveBelieved
        );
    }

    #[test]
    fn test_suspended_cycle_is_dropped() {
        let mut rig = Rig::new();
        rig.touch(&[finger(1, 10, 10, 5)]);
        rig.sink.take();

        rig.session.suspend(&mut rig.sink);
        assert_eq!(rig.sink.take().len(), 3);
        assert_eq!(
            rig.touch(&[finger(1, 10, 10, 5)]),
            CycleOutcome::Suspended
        );
        assert!(rig.sink.events.is_empty());

        rig.session.resume();
        assert!(matches!(
            rig.touch(&[finger(1, 10, 10, 5)]),
            CycleOutcome::Reported(_)
        ));
    }

    #[test]
    fn test_covered_surface_filters_hover() {
        let mut rig = Rig::new();
        rig.session
            .store_cover(&mut rig.transport, "0")
            .unwrap();
        assert!(rig.session.surface_covered());

        rig.session
            .classifier_mut()
            .set_state(TouchTypeState::FingerBelieved);
        rig.touch(&[hover(1, EventType::TouchDown, 10, 10)]);
        assert!(rig.session.classifier().slots().iter().all(|s| s.candidate.is_none()));
        assert_eq!(rig.session.memory().previous_object_type, ObjectType::Hover);
    }

    #[test]
    fn test_glove_drag_then_finger() {
        let mut rig = Rig::new();
        rig.touch(&[finger(1, 10, 10, 5)]);
        rig.touch(&[]);
        rig.sink.take();

        rig.touch(&[hover(2, EventType::TouchDown, 100, 100)]);
        rig.touch(&[hover(2, EventType::Move, 100, 260)]);
        assert_eq!(
            rig.session.classifier().state(),
            TouchTypeState::GloveBelieved
        );
        // Hover contacts never reach the sink.
        assert!(!rig
            .sink
            .events
            .iter()
            .any(|e| matches!(e, SinkEvent::Slot(_))));

        rig.sink.take();
        rig.touch(&[finger(2, 100, 260, 30)]);
        assert_eq!(rig.sink.key_edges(), vec![true]);
        assert_eq!(
            rig.session.classifier().state(),
            TouchTypeState::FingerBelieved
        );
    }

    #[test]
    fn test_driver_serializes_parts() {
        let driver = Driver::new(
            DeviceConfig::tma4xx(),
            SnapshotTransport::new(),
            EventRecorder::new(),
        );
        let si = DeviceConfig::tma4xx().sysinfo;
        driver.with(|_, transport, _| transport.load(packet(&si, 0, 0, &[finger(3, 1, 2, 3)])));
        assert!(matches!(driver.attention().unwrap(), CycleOutcome::Reported(_)));

        assert_eq!(driver.store_cover("0").unwrap(), 1);
        assert_eq!(driver.show_cover(), "0");

        driver.suspend();
        assert_eq!(driver.attention().unwrap(), CycleOutcome::Suspended);
        driver.resume();

        let (session, _, sink) = driver.into_parts();
        assert!(session.surface_covered());
        let mut released = SlotBitmap::new();
        released.set(3);
        assert!(sink.events.contains(&SinkEvent::FinalSync {
            max_slots: 10,
            emitted: 1,
            active: released,
        }));
        assert!(sink.events.contains(&SinkEvent::ReleaseAll));
    }
}
