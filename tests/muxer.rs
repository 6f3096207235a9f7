mod tests {
    use embassy_time::Instant;
    use lightmux::color::Rgb;
    use lightmux::muxer::{
        ComponentKind, LOWEST_PRIORITY, MuxerError, MuxerEvent, PayloadRef, PriorityMuxer,
    };

    type Muxer = PriorityMuxer<4, 16, 8>;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const GREEN: Rgb = Rgb::new(0, 255, 0);

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn register(muxer: &mut Muxer, priority: u8, kind: ComponentKind) {
        muxer
            .register_input(priority, kind, "test", "test", 0)
            .unwrap();
    }

    #[test]
    fn test_visible_priority_is_minimum() {
        let mut muxer = Muxer::new(2);
        assert_eq!(muxer.current_priority(), LOWEST_PRIORITY);

        register(&mut muxer, 100, ComponentKind::Color);
        // Registered but no payload yet: still not visible.
        assert_eq!(muxer.current_priority(), LOWEST_PRIORITY);

        muxer.set_colors(100, &[RED; 2], -1, at(0)).unwrap();
        assert_eq!(muxer.current_priority(), 100);

        register(&mut muxer, 50, ComponentKind::Effect);
        muxer.set_colors(50, &[GREEN; 2], -1, at(0)).unwrap();
        assert_eq!(muxer.current_priority(), 50);

        register(&mut muxer, 200, ComponentKind::Network);
        muxer.set_colors(200, &[RED; 2], -1, at(0)).unwrap();
        assert_eq!(muxer.current_priority(), 50);

        assert!(muxer.clear(50, at(0)));
        assert_eq!(muxer.current_priority(), 100);
        assert_eq!(muxer.previous_priority(), 50);
    }

    #[test]
    fn test_timeout_expires_without_clear() {
        let mut muxer = Muxer::new(1);
        register(&mut muxer, 50, ComponentKind::Effect);
        register(&mut muxer, 100, ComponentKind::Color);
        muxer.set_colors(100, &[RED], -1, at(0)).unwrap();
        muxer.set_colors(50, &[GREEN], 500, at(0)).unwrap();
        assert_eq!(muxer.current_priority(), 50);

        // Sweep before the deadline keeps the channel.
        muxer.sweep(at(499));
        assert_eq!(muxer.current_priority(), 50);
        assert!(muxer.has_priority(50));

        muxer.sweep(at(600));
        assert_eq!(muxer.current_priority(), 100);
        assert!(!muxer.has_priority(50));
    }

    #[test]
    fn test_zero_timeout_expires_immediately() {
        let mut muxer = Muxer::new(1);
        register(&mut muxer, 10, ComponentKind::Color);
        muxer.set_colors(10, &[RED], 0, at(5)).unwrap();
        assert_eq!(muxer.current_priority(), LOWEST_PRIORITY);
    }

    #[test]
    fn test_error_paths() {
        let mut muxer = Muxer::new(2);
        assert_eq!(
            muxer.set_colors(10, &[RED; 2], -1, at(0)),
            Err(MuxerError::NotRegistered)
        );

        register(&mut muxer, 10, ComponentKind::Color);
        assert_eq!(
            muxer.set_colors(10, &[RED; 2], -5, at(0)),
            Err(MuxerError::InvalidTimeout)
        );
        assert_eq!(
            muxer.set_colors(10, &[RED; 3], -1, at(0)),
            Err(MuxerError::GeometryMismatch)
        );
        assert_eq!(
            muxer.register_input(LOWEST_PRIORITY, ComponentKind::Color, "x", "x", 0),
            Err(MuxerError::Reserved)
        );

        // Failed calls never disturb visibility.
        assert_eq!(muxer.current_priority(), LOWEST_PRIORITY);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut muxer = Muxer::new(1);
        register(&mut muxer, 10, ComponentKind::Color);
        muxer.set_colors(10, &[RED], -1, at(0)).unwrap();

        // Re-registering updates metadata but keeps the payload.
        muxer
            .register_input(10, ComponentKind::Network, "other", "other", 1)
            .unwrap();
        let info = muxer.input_info(10);
        assert_eq!(info.kind, ComponentKind::Network);
        assert_eq!(info.origin, "other");
        assert_eq!(info.smooth_cfg, 1);
        assert!(matches!(info.payload, PayloadRef::Colors(_)));
        assert_eq!(muxer.current_priority(), 10);
    }

    #[test]
    fn test_clear_all_preserves_baseline() {
        let mut muxer = Muxer::new(1);
        register(&mut muxer, 254, ComponentKind::Background);
        muxer.set_colors(254, &[RED], -1, at(0)).unwrap();
        register(&mut muxer, 50, ComponentKind::Effect);
        muxer.set_colors(50, &[GREEN], -1, at(0)).unwrap();

        muxer.clear_all(false, at(0));
        assert!(muxer.has_priority(254));
        assert!(!muxer.has_priority(50));
        assert_eq!(muxer.current_priority(), 254);

        muxer.clear_all(true, at(0));
        assert!(!muxer.has_priority(254));
        assert_eq!(muxer.current_priority(), LOWEST_PRIORITY);
    }

    #[test]
    fn test_input_inactive_keeps_channel() {
        let mut muxer = Muxer::new(1);
        register(&mut muxer, 50, ComponentKind::Grabber);
        muxer.set_colors(50, &[RED], -1, at(0)).unwrap();
        assert_eq!(muxer.current_priority(), 50);

        assert!(muxer.set_input_inactive(50, at(0)));
        assert_eq!(muxer.current_priority(), LOWEST_PRIORITY);
        assert!(muxer.has_priority(50));

        // The sweep must not remove manually inactivated channels.
        muxer.sweep(at(10_000));
        assert!(muxer.has_priority(50));

        // The next payload reactivates it.
        muxer.set_colors(50, &[GREEN], -1, at(10_001)).unwrap();
        assert_eq!(muxer.current_priority(), 50);
    }

    #[test]
    fn test_auto_select_pinning() {
        let mut muxer = Muxer::new(1);
        register(&mut muxer, 100, ComponentKind::Color);
        muxer.set_colors(100, &[RED], -1, at(0)).unwrap();
        muxer.set_auto_select(false, at(0));

        // A better channel shows up while pinned: no switch.
        register(&mut muxer, 50, ComponentKind::Effect);
        muxer.set_colors(50, &[GREEN], -1, at(0)).unwrap();
        assert_eq!(muxer.current_priority(), 100);
        assert!(!muxer.auto_select_enabled());

        // Pinned channel goes away: fall through and resume auto-select.
        muxer.clear(100, at(1));
        assert_eq!(muxer.current_priority(), 50);
        assert!(muxer.auto_select_enabled());
    }

    #[test]
    fn test_select_priority() {
        let mut muxer = Muxer::new(1);
        register(&mut muxer, 50, ComponentKind::Effect);
        muxer.set_colors(50, &[GREEN], -1, at(0)).unwrap();
        register(&mut muxer, 100, ComponentKind::Color);
        muxer.set_colors(100, &[RED], -1, at(0)).unwrap();

        assert!(!muxer.select_priority(77, at(0)));
        assert!(muxer.select_priority(100, at(0)));
        assert_eq!(muxer.current_priority(), 100);
        assert!(!muxer.auto_select_enabled());

        muxer.set_auto_select(true, at(0));
        assert_eq!(muxer.current_priority(), 50);
    }

    #[test]
    fn test_change_events() {
        let mut muxer = Muxer::new(1);
        register(&mut muxer, 100, ComponentKind::Color);
        muxer.set_colors(100, &[RED], -1, at(0)).unwrap();
        assert_eq!(
            muxer.poll_event(),
            Some(MuxerEvent::VisiblePriorityChanged(100))
        );
        // Sentinel kind is Color, so no component event yet.
        assert_eq!(muxer.poll_event(), None);

        register(&mut muxer, 50, ComponentKind::Effect);
        muxer.set_colors(50, &[GREEN], -1, at(0)).unwrap();
        assert_eq!(
            muxer.poll_event(),
            Some(MuxerEvent::VisiblePriorityChanged(50))
        );
        assert_eq!(
            muxer.poll_event(),
            Some(MuxerEvent::VisibleComponentChanged(ComponentKind::Effect))
        );
        assert_eq!(muxer.poll_event(), None);
    }

    #[test]
    fn test_unknown_priority_yields_sentinel_info() {
        let muxer = Muxer::new(1);
        let info = muxer.input_info(123);
        assert_eq!(info.priority, LOWEST_PRIORITY);
        assert!(matches!(info.payload, PayloadRef::None));
    }
}
