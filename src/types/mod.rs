pub use self::ask_event::{
    AskAmount, AskCriteria, AskCriteriaData, AskCriteriaToken, AskEvent,
    AskEventInfo, AskEventsResponse, AskOrder, AskPrice,
};

mod ask_event;
