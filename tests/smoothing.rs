mod tests {
    use embassy_time::{Duration, Instant};
    use lightmux::color::Rgb;
    use lightmux::smoothing::{Smoothing, SmoothingConfig};

    const RED: Rgb = Rgb::new(200, 0, 0);
    const BLACK: Rgb = Rgb::new(0, 0, 0);

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn base_config() -> SmoothingConfig {
        // 100 ms settling, 100 Hz output, no extra delay.
        SmoothingConfig::new(Duration::from_millis(100), 100.0, 0)
    }

    fn settled(settling: &mut Smoothing<2>, colors: &[Rgb], now: Instant) {
        settling.update_target(colors, now);
        settling.tick(now);
    }

    #[test]
    fn test_first_target_is_emitted_as_is() {
        let mut smoothing = Smoothing::<2>::new(base_config(), 2);
        smoothing.update_target(&[RED, BLACK], at(0));
        let frame = smoothing.tick(at(0)).unwrap();
        assert_eq!(frame, &[RED, BLACK]);
    }

    #[test]
    fn test_converges_without_overshoot() {
        let mut smoothing = Smoothing::<2>::new(base_config(), 2);
        settled(&mut smoothing, &[BLACK, BLACK], at(0));

        smoothing.update_target(&[RED, RED], at(0));
        let mut last = 0u8;
        for ms in (10..100).step_by(10) {
            let frame = smoothing.tick(at(ms)).unwrap();
            let r = frame[0].r;
            assert!(r >= last, "interpolation went backwards at {ms} ms");
            assert!(r <= RED.r, "overshot the target at {ms} ms");
            last = r;
        }
        // Strictly between endpoints mid-way through.
        assert!(last > 0 && last < RED.r);

        // Once the settling time elapsed the target is reached exactly.
        let frame = smoothing.tick(at(100)).unwrap();
        assert_eq!(frame, &[RED, RED]);
    }

    #[test]
    fn test_tick_respects_update_interval() {
        let mut smoothing = Smoothing::<2>::new(base_config(), 2);
        settled(&mut smoothing, &[RED, RED], at(0));

        // 100 Hz: nothing due again before 10 ms have passed.
        assert!(smoothing.tick(at(5)).is_none());
        assert!(smoothing.tick(at(10)).is_some());
        assert_eq!(smoothing.next_deadline(), Some(at(20)));
    }

    #[test]
    fn test_pause_preserves_state() {
        let mut smoothing = Smoothing::<2>::new(base_config(), 2);
        settled(&mut smoothing, &[RED, RED], at(0));

        smoothing.set_pause(true);
        assert!(smoothing.tick(at(50)).is_none());

        // Targets keep flowing while paused.
        smoothing.update_target(&[BLACK, BLACK], at(50));

        smoothing.set_pause(false);
        let frame = smoothing.tick(at(200)).unwrap();
        assert_eq!(frame, &[BLACK, BLACK]);
    }

    #[test]
    fn test_disabled_emits_nothing() {
        let mut smoothing = Smoothing::<2>::new(base_config(), 2);
        settled(&mut smoothing, &[RED, RED], at(0));
        smoothing.set_enabled(false);
        assert!(smoothing.tick(at(100)).is_none());
        assert_eq!(smoothing.next_deadline(), None);
    }

    #[test]
    fn test_config_switch_takes_effect_next_tick() {
        let mut smoothing = Smoothing::<2>::new(base_config(), 2);
        let slow = SmoothingConfig::new(Duration::from_millis(500), 20.0, 0);
        let id = smoothing.add_config(slow).unwrap();
        assert_eq!(id, 1);

        settled(&mut smoothing, &[RED, RED], at(0));
        smoothing.select_config(id);
        assert_eq!(smoothing.selected_config(), 0);

        smoothing.tick(at(10));
        assert_eq!(smoothing.selected_config(), 1);

        // Unknown ids fall back to the base profile.
        smoothing.select_config(99);
        smoothing.tick(at(100));
        assert_eq!(smoothing.selected_config(), 0);
    }

    #[test]
    fn test_update_delay_adds_fixed_latency() {
        let config = SmoothingConfig::new(Duration::from_millis(0), 100.0, 2);
        let mut smoothing = Smoothing::<2>::new(config, 2);
        smoothing.update_target(&[RED, RED], at(0));

        // The queue fills for `update_delay` ticks before frames emerge.
        assert!(smoothing.tick(at(0)).is_none());
        assert!(smoothing.tick(at(10)).is_none());
        let frame = smoothing.tick(at(20)).unwrap();
        assert_eq!(frame, &[RED, RED]);
    }
}
