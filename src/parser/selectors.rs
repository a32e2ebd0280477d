//! CSS selectors for the fixed anytask page layout

use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selectors {
    ($($name:ident = $css:expr;)*) => {
        $(
            pub(crate) static $name: LazyLock<Selector> =
                LazyLock::new(|| Selector::parse($css).expect($css));
        )*
    };
}

selectors! {
    A = "a";
    A_HREF = "a[href]";
    DIV = "div";
    H6 = "h6";
    SPAN_LABEL = "span.label";

    // Course page
    COURSE_TITLE = "h5.card-title";
    COURSE_TEACHERS = "p.course_teachers a";
    TASKS_TAB = "div#tasks-tab";
    TASKS_TABLE = "div#tasks-table";
    TASK_ROW = "div.tasks-list";
    GROUP_COLLAPSE = "div[id^=\"collapse_group_\"]";
    COLLAPSE_TOGGLE = "a[data-toggle=\"collapse\"]";
    TASK_TEXTAREA = "textarea#id_task_text";
    CK_EDITOR = "div[class*=\"ck-editor\"]";

    // Queue page
    FILTER_MODAL = "div#modal_filter";
    OPTION = "option";

    // Issue page
    ACCORDION = "div#accordion2";
    CARD = "div.card";
    ACCORDION_LABEL = "div.accordion2-label";
    ACCORDION_RESULT = "div.accordion2-result";
    TASK_DESCRIPTION_BTN = "a#modal_task_description_btn";
    USER_LINK = "a.user";
    HISTORY = "ul.history";
    LI = "li";
    ROW = "div.row";
    STRONG = "strong";
    CARD_LINK = "a.card-link";
    COMMENT_TIME = "small.text-muted";
    HISTORY_BODY = "div.history-body";
    COMMENT_CONTENT = "div.issue-page-comment";
    FILES = "div.files";
    IPYNB_LINK = "div.ipynb-file-link";
    DROPDOWN_TOGGLE = "a.dropdown-toggle";
    DROPDOWN_MENU = "div.dropdown-menu";
    DROPDOWN_ITEM = "a.dropdown-item";

    // Gradebook page
    RESULTS_TABLE = "table.table-results";
    CARD_TITLE_LINK = "h5.card-title a.card-link";
    THEAD_ROW = "thead tr";
    TH = "th";
    TBODY = "tbody";
    LABEL_INVERSE = "span.label-inverse";
}
