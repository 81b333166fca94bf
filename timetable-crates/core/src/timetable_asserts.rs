#[cfg(all(not(test), not(feature = "debug-checks")))]
pub(crate) const TIMETABLE_ASSERT_LEVEL_DEFINITION: u8 = TIMETABLE_ASSERT_SIMPLE;

#[cfg(any(test, feature = "debug-checks"))]
pub(crate) const TIMETABLE_ASSERT_LEVEL_DEFINITION: u8 = TIMETABLE_ASSERT_ADVANCED;

pub(crate) const TIMETABLE_ASSERT_SIMPLE: u8 = 1;
pub(crate) const TIMETABLE_ASSERT_MODERATE: u8 = 2;
pub(crate) const TIMETABLE_ASSERT_ADVANCED: u8 = 3;

macro_rules! print_timetable_assert_warning_message {
    () => {
        if $crate::timetable_asserts::TIMETABLE_ASSERT_LEVEL_DEFINITION >= $crate::timetable_asserts::TIMETABLE_ASSERT_MODERATE {
            log::warn!("Potential performance degradation: the timetable assert level is set to {}, meaning many debug asserts are active which may result in performance degradation.", $crate::timetable_asserts::TIMETABLE_ASSERT_LEVEL_DEFINITION);
        };
    };
}

macro_rules! timetable_assert_simple {
    ($($arg:tt)*) => {
        if $crate::timetable_asserts::TIMETABLE_ASSERT_LEVEL_DEFINITION >= $crate::timetable_asserts::TIMETABLE_ASSERT_SIMPLE {
            assert!($($arg)*);
        }
    };
}

macro_rules! timetable_assert_eq_simple {
    ($($arg:tt)*) => {
        if $crate::timetable_asserts::TIMETABLE_ASSERT_LEVEL_DEFINITION >= $crate::timetable_asserts::TIMETABLE_ASSERT_SIMPLE {
            assert_eq!($($arg)*);
        }
    };
}

macro_rules! timetable_assert_moderate {
    ($($arg:tt)*) => {
        if $crate::timetable_asserts::TIMETABLE_ASSERT_LEVEL_DEFINITION >= $crate::timetable_asserts::TIMETABLE_ASSERT_MODERATE {
            assert!($($arg)*);
        }
    };
}

macro_rules! timetable_assert_advanced {
    ($($arg:tt)*) => {
        if $crate::timetable_asserts::TIMETABLE_ASSERT_LEVEL_DEFINITION >= $crate::timetable_asserts::TIMETABLE_ASSERT_ADVANCED {
            assert!($($arg)*);
        }
    };
}

pub(crate) use print_timetable_assert_warning_message;
pub(crate) use timetable_assert_advanced;
pub(crate) use timetable_assert_eq_simple;
pub(crate) use timetable_assert_moderate;
pub(crate) use timetable_assert_simple;
