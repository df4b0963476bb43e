use crate::i18n::{Locale, Msg, tr};
use crate::model::View;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MenuTarget {
    View(View),
    CreateWorkload,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MenuItem {
    pub label: Msg,
    pub target: MenuTarget,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MenuGroup {
    pub title: Msg,
    pub items: &'static [MenuItem],
}

pub const MENU: [MenuGroup; 2] = [
    MenuGroup {
        title: Msg::MenuResources,
        items: &[
            MenuItem {
                label: Msg::Workloads,
                target: MenuTarget::View(View::Workloads),
            },
            MenuItem {
                label: Msg::Services,
                target: MenuTarget::View(View::Services),
            },
            MenuItem {
                label: Msg::Namespaces,
                target: MenuTarget::View(View::Namespaces),
            },
            MenuItem {
                label: Msg::Clusters,
                target: MenuTarget::View(View::Clusters),
            },
        ],
    },
    MenuGroup {
        title: Msg::MenuActions,
        items: &[MenuItem {
            label: Msg::CreateWorkload,
            target: MenuTarget::CreateWorkload,
        }],
    },
];

pub fn view_label(locale: Locale, view: View) -> &'static str {
    let msg = match view {
        View::Workloads => Msg::Workloads,
        View::Services => Msg::Services,
        View::Namespaces => Msg::Namespaces,
        View::Clusters => Msg::Clusters,
    };
    tr(locale, msg)
}

#[cfg(test)]
mod tests {
    use super::{MENU, MenuTarget, view_label};
    use crate::i18n::{Locale, Msg, tr};
    use crate::model::View;

    #[test]
    fn menu_groups_resources_before_actions() {
        assert_eq!(MENU[0].title, Msg::MenuResources);
        assert_eq!(MENU[0].items.len(), 4);
        assert_eq!(MENU[1].items[0].target, MenuTarget::CreateWorkload);
    }

    #[test]
    fn labels_follow_locale() {
        let services = MENU[0].items[1];
        assert_eq!(services.target, MenuTarget::View(View::Services));
        assert_eq!(tr(Locale::Es, services.label), "Servicios");
        assert_eq!(view_label(Locale::De, View::Namespaces), "Namespaces");
    }
}
