//! Wrap-aware event firing (§4.5.4, invariant 7): advancing a looping
//! clock by more than one cycle must fire every crossed event exactly once,
//! in time order, even when the advance straddles (or laps) the wrap point.

use crate::clip::ClipEvent;

/// Advance a looping clock from `time` by `delta` seconds (any magnitude,
/// either sign — a negative `delta` rewinds, per §6), firing every event
/// crossed via `on_event`. Returns the new, wrapped-into-`[0, duration)` time.
pub fn advance_looping_clock(
    events: &[ClipEvent],
    time: f32,
    delta: f32,
    duration: f32,
    mut on_event: impl FnMut(&ClipEvent),
) -> f32 {
    if duration <= 0.0 || delta == 0.0 {
        return time;
    }
    if delta > 0.0 {
        advance_forward(events, time, delta, duration, &mut on_event)
    } else {
        advance_backward(events, time, -delta, duration, &mut on_event)
    }
}

/// Advance a non-looping clock, clamping at `[0, duration]` and firing every
/// event crossed up to (and including) the clamp point, but none after it
/// (invariant 8: no further events once clamped).
pub fn advance_clamped_clock(
    events: &[ClipEvent],
    time: f32,
    delta: f32,
    duration: f32,
    mut on_event: impl FnMut(&ClipEvent),
) -> f32 {
    if delta == 0.0 {
        return time;
    }
    let raw = time + delta;
    let clamped = raw.clamp(0.0, duration.max(0.0));
    if delta > 0.0 {
        fire_open_closed(events, time, clamped, &mut on_event);
    } else {
        fire_closed_open_reverse(events, clamped, time, &mut on_event);
    }
    clamped
}

fn advance_forward(
    events: &[ClipEvent],
    time: f32,
    mut delta: f32,
    duration: f32,
    on_event: &mut impl FnMut(&ClipEvent),
) -> f32 {
    let mut cursor = time;
    loop {
        let to_boundary = duration - cursor;
        if delta < to_boundary {
            let next = cursor + delta;
            fire_open_closed(events, cursor, next, on_event);
            return next;
        }
        fire_open_closed(events, cursor, duration, on_event);
        delta -= to_boundary;
        cursor = 0.0;
        if delta <= 0.0 {
            return 0.0;
        }
    }
}

fn advance_backward(
    events: &[ClipEvent],
    time: f32,
    mut delta: f32,
    duration: f32,
    on_event: &mut impl FnMut(&ClipEvent),
) -> f32 {
    let mut cursor = time;
    loop {
        let to_boundary = cursor;
        if delta < to_boundary {
            let next = cursor - delta;
            fire_closed_open_reverse(events, next, cursor, on_event);
            return next;
        }
        fire_closed_open_reverse(events, 0.0, cursor, on_event);
        delta -= to_boundary;
        cursor = duration;
        if delta <= 0.0 {
            return duration;
        }
    }
}

fn fire_open_closed(events: &[ClipEvent], lo: f32, hi: f32, on_event: &mut impl FnMut(&ClipEvent)) {
    for e in events {
        if e.time > lo && e.time <= hi {
            on_event(e);
        }
    }
}

fn fire_closed_open_reverse(events: &[ClipEvent], lo: f32, hi: f32, on_event: &mut impl FnMut(&ClipEvent)) {
    for e in events {
        if e.time >= lo && e.time < hi {
            on_event(e);
        }
    }
}
